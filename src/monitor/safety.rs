//! Safety predicate over a sensor snapshot.
//!
//! The comparisons run against the raw values, so any reading still at its
//! fail-safe default keeps the result at "unsafe". Cloud cover is compared
//! for exact inequality with its default: a reading of exactly 100% cannot be
//! told apart from "no reading yet" and is treated as unsafe.

use crate::models::{SensorState, DEFAULT_CLOUD_COVER};

/// Default upper limit for the probability of precipitation, in percent.
pub const DEFAULT_PRECIPITATION_PROBABILITY_LIMIT: f64 = 5.0;

/// Average wind speed at or above which operation is unsafe, in m/s.
pub const WIND_SPEED_LIMIT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyEvaluator {
    precipitation_probability_limit: f64,
}

impl Default for SafetyEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_PRECIPITATION_PROBABILITY_LIMIT)
    }
}

impl SafetyEvaluator {
    pub fn new(precipitation_probability_limit: f64) -> Self {
        SafetyEvaluator {
            precipitation_probability_limit,
        }
    }

    pub fn precipitation_probability_limit(&self) -> f64 {
        self.precipitation_probability_limit
    }

    /// Whether outdoor equipment may operate under `state`.
    pub fn evaluate(&self, state: &SensorState) -> bool {
        state.cloud_cover != DEFAULT_CLOUD_COVER
            && state.probability_of_precipitation <= self.precipitation_probability_limit
            && state.rain_rate == 0.0
            && state.forecast_precipitation == 0.0
            && !state.rain_in_region
            && state.wind_speed_avg < WIND_SPEED_LIMIT
    }

    /// Names of the inputs that currently make `state` unsafe.
    ///
    /// Empty exactly when [`evaluate`](Self::evaluate) returns true.
    pub fn blocking_conditions(&self, state: &SensorState) -> Vec<&'static str> {
        let checks = [
            (state.cloud_cover != DEFAULT_CLOUD_COVER, "cloud cover"),
            (
                state.probability_of_precipitation <= self.precipitation_probability_limit,
                "probability of precipitation",
            ),
            (state.rain_rate == 0.0, "rain rate"),
            (state.forecast_precipitation == 0.0, "forecast precipitation"),
            (!state.rain_in_region, "rain in region"),
            (state.wind_speed_avg < WIND_SPEED_LIMIT, "wind speed"),
        ];

        checks
            .iter()
            .filter(|(passed, _)| !passed)
            .map(|(_, name)| *name)
            .collect()
    }
}
