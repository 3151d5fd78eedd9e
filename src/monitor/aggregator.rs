/// Shared sensor state behind a single guard
use log::{info, warn};
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::OffsetDateTime;

use crate::error::MonitorError;
use crate::models::{reading, SensorState};
use crate::monitor::rain_rate::RainRateEstimator;
use crate::monitor::safety::SafetyEvaluator;
use crate::utils::{format_datetime, kmh_to_ms, parse_flag, parse_reading};

/// A safety decision together with the state it was made on
#[derive(Debug, Clone, PartialEq)]
pub struct SafetyStatus {
    pub state: SensorState,
    pub safe: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: SensorState,
    rain: RainRateEstimator,
}

/// Folds sensor updates into one snapshot and answers the safety query.
///
/// Every update and query takes the same lock for its whole body, so a query
/// never observes a partially applied update. Payloads are parsed before the
/// lock is taken; a malformed payload leaves the state untouched.
///
/// Share it between the message adapter and query callers with an `Arc`.
#[derive(Debug)]
pub struct StateAggregator {
    shared: Mutex<Shared>,
    evaluator: SafetyEvaluator,
}

impl Default for StateAggregator {
    fn default() -> Self {
        Self::new(SafetyEvaluator::default())
    }
}

impl StateAggregator {
    pub fn new(evaluator: SafetyEvaluator) -> Self {
        StateAggregator {
            shared: Mutex::new(Shared::default()),
            evaluator,
        }
    }

    // Every critical section leaves the state consistent, so a panic in
    // another holder does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_connected(&self, connected: bool) {
        self.lock().state.connected = connected;

        if connected {
            info!("[connected]");
        } else {
            info!("[disconnected]");
        }
    }

    /// Transport connection status. `is_safe` is not to be trusted while false.
    pub fn connected(&self) -> bool {
        self.lock().state.connected
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SensorState {
        self.lock().state.clone()
    }

    pub fn precipitation_probability_limit(&self) -> f64 {
        self.evaluator.precipitation_probability_limit()
    }

    pub fn update_cloud_cover(&self, payload: &str) -> Result<(), MonitorError> {
        self.update_reading(reading::CLOUD_COVER, payload, |state, value| {
            state.cloud_cover = value;
        })
    }

    pub fn update_probability_of_precipitation(&self, payload: &str) -> Result<(), MonitorError> {
        self.update_reading(reading::PROBABILITY_OF_PRECIPITATION, payload, |state, value| {
            state.probability_of_precipitation = value;
        })
    }

    pub fn update_forecast_precipitation(&self, payload: &str) -> Result<(), MonitorError> {
        self.update_reading(reading::FORECAST_PRECIPITATION, payload, |state, value| {
            state.forecast_precipitation = value;
        })
    }

    /// Payload is km/h; stored as m/s.
    pub fn update_wind_speed_avg(&self, payload: &str) -> Result<(), MonitorError> {
        self.update_reading(reading::WIND_SPEED_AVG, payload, |state, value| {
            state.wind_speed_avg = kmh_to_ms(value);
        })
    }

    /// Only the literal "true" sets the flag; anything else clears it.
    pub fn update_rain_in_region(&self, payload: &str) {
        let rain_in_region = parse_flag(payload);

        let mut shared = self.lock();
        shared.state.rain_in_region = rain_in_region;
        info!("[{}] value {}", reading::RAIN_IN_REGION, rain_in_region);
    }

    /// Record a cumulative rain counter reading (mm) taken at `now`
    ///
    /// The rain rate becomes the mm/hour rate between this reading and the
    /// previous one.
    pub fn update_rain_event(&self, payload: &str, now: OffsetDateTime) -> Result<(), MonitorError> {
        let total = match parse_reading(reading::RAIN_EVENT, payload) {
            Ok(total) => total,
            Err(e) => {
                warn!("{}", e);
                return Err(e);
            }
        };

        let mut shared = self.lock();
        let rate = shared.rain.observe(total, now);
        shared.state.rain_rate = rate;
        info!(
            "[rain rate] value {} (counter {} mm at {})",
            rate,
            total,
            format_datetime(&now)
        );

        Ok(())
    }

    /// Whether it is safe to operate outdoor equipment
    ///
    /// Evaluation and the summary log line happen under the lock, so both
    /// reflect the same snapshot.
    pub fn is_safe(&self) -> bool {
        let shared = self.lock();
        self.evaluate_logged(&shared.state)
    }

    /// Decision and snapshot taken under the same lock
    pub fn status(&self) -> SafetyStatus {
        let shared = self.lock();
        let safe = self.evaluate_logged(&shared.state);

        SafetyStatus {
            state: shared.state.clone(),
            safe,
        }
    }

    fn evaluate_logged(&self, state: &SensorState) -> bool {
        let safe = self.evaluator.evaluate(state);

        info!(
            "cloud cover: {}, pop: {}, rain rate: {}, forecast precip: {}, rain in region: {}, avg wind speed: {:.2} m/s -> {}",
            state.cloud_cover,
            state.probability_of_precipitation,
            state.rain_rate,
            state.forecast_precipitation,
            state.rain_in_region,
            state.wind_speed_avg,
            if safe {
                "safe".to_string()
            } else {
                format!("unsafe ({})", self.evaluator.blocking_conditions(state).join(", "))
            }
        );

        safe
    }

    fn update_reading<F>(&self, name: &'static str, payload: &str, apply: F) -> Result<(), MonitorError>
    where
        F: FnOnce(&mut SensorState, f64),
    {
        let value = match parse_reading(name, payload) {
            Ok(value) => value,
            Err(e) => {
                warn!("{}", e);
                return Err(e);
            }
        };

        let mut shared = self.lock();
        apply(&mut shared.state, value);
        info!("[{}] value {}", name, value);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn at(secs: i64) -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH + Duration::seconds(secs)
    }

    #[test]
    fn fresh_aggregator_is_unsafe_and_disconnected() {
        let aggregator = StateAggregator::default();
        assert!(!aggregator.is_safe());
        assert!(!aggregator.connected());
        assert_eq!(aggregator.snapshot(), SensorState::default());
    }

    #[test]
    fn direct_fields_take_parsed_values() {
        let aggregator = StateAggregator::default();
        aggregator.update_cloud_cover("40").unwrap();
        aggregator.update_probability_of_precipitation("3.5").unwrap();
        aggregator.update_forecast_precipitation("0.2").unwrap();

        let state = aggregator.snapshot();
        assert_eq!(state.cloud_cover, 40.0);
        assert_eq!(state.probability_of_precipitation, 3.5);
        assert_eq!(state.forecast_precipitation, 0.2);
    }

    #[test]
    fn wind_speed_is_stored_in_metres_per_second() {
        let aggregator = StateAggregator::default();
        aggregator.update_wind_speed_avg("36").unwrap();
        assert!((aggregator.snapshot().wind_speed_avg - 10.0).abs() < 1e-12);
    }

    #[test]
    fn rain_in_region_needs_exact_literal() {
        let aggregator = StateAggregator::default();
        aggregator.update_rain_in_region("false");
        assert!(!aggregator.snapshot().rain_in_region);
        aggregator.update_rain_in_region("true");
        assert!(aggregator.snapshot().rain_in_region);
        aggregator.update_rain_in_region("True");
        assert!(!aggregator.snapshot().rain_in_region);
    }

    #[test]
    fn rain_events_drive_rain_rate() {
        let aggregator = StateAggregator::default();
        aggregator.update_rain_event("10.0", at(0)).unwrap();
        assert_eq!(aggregator.snapshot().rain_rate, 0.0);

        aggregator.update_rain_event("10.5", at(1800)).unwrap();
        assert!((aggregator.snapshot().rain_rate - 1.0).abs() < 1e-9);
    }

    #[test]
    fn malformed_payload_keeps_previous_value() {
        let aggregator = StateAggregator::default();
        aggregator.update_cloud_cover("40").unwrap();

        let err = aggregator.update_cloud_cover("abc").unwrap_err();
        assert!(matches!(
            err,
            MonitorError::MalformedPayload { reading: "cloud cover", .. }
        ));
        assert_eq!(aggregator.snapshot().cloud_cover, 40.0);
    }

    #[test]
    fn malformed_rain_event_does_not_shift_counter() {
        let aggregator = StateAggregator::default();
        aggregator.update_rain_event("1.0", at(0)).unwrap();
        assert!(aggregator.update_rain_event("", at(10)).is_err());
        aggregator.update_rain_event("2.0", at(3600)).unwrap();
        assert!((aggregator.snapshot().rain_rate - 1.0).abs() < 1e-9);
    }

    #[test]
    fn status_pairs_decision_with_its_state() {
        let aggregator = StateAggregator::default();
        let status = aggregator.status();
        assert!(!status.safe);
        assert_eq!(status.state, SensorState::default());

        aggregator.set_connected(true);
        aggregator.update_cloud_cover("20").unwrap();
        aggregator.update_probability_of_precipitation("0").unwrap();
        aggregator.update_rain_event("0", at(0)).unwrap();
        aggregator.update_forecast_precipitation("0").unwrap();
        aggregator.update_rain_in_region("false");
        aggregator.update_wind_speed_avg("10").unwrap();

        let status = aggregator.status();
        assert!(status.safe);
        assert!(status.state.connected);
        assert_eq!(status.state, aggregator.snapshot());
    }

    #[test]
    fn connection_flag_round_trips() {
        let aggregator = StateAggregator::default();
        aggregator.set_connected(true);
        assert!(aggregator.connected());
        aggregator.set_connected(false);
        assert!(!aggregator.connected());
    }
}
