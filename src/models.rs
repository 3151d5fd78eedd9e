use time::OffsetDateTime;

/// Cloud cover reported before any reading has arrived (fully overcast).
pub const DEFAULT_CLOUD_COVER: f64 = 100.0;
pub const DEFAULT_PROBABILITY_OF_PRECIPITATION: f64 = 100.0;
pub const DEFAULT_FORECAST_PRECIPITATION: f64 = 999.0;
pub const DEFAULT_RAIN_RATE: f64 = 1.0;
pub const DEFAULT_WIND_SPEED_AVG: f64 = 100.0;

/// Names of the readings, as used in log lines and errors
pub mod reading {
    pub const CLOUD_COVER: &str = "cloud cover";
    pub const PROBABILITY_OF_PRECIPITATION: &str = "probability of precipitation";
    pub const RAIN_EVENT: &str = "rain event";
    pub const FORECAST_PRECIPITATION: &str = "forecast precipitation";
    pub const RAIN_IN_REGION: &str = "rain in region";
    pub const WIND_SPEED_AVG: &str = "avg wind speed";
}

/// Snapshot of every observed and derived environmental value.
///
/// All defaults are chosen so that the safety predicate evaluates to
/// "unsafe" until live data has been received for every input.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorState {
    /// Cloud cover in percent (0-100).
    pub cloud_cover: f64,
    /// Forecast probability of precipitation in percent (0-100).
    pub probability_of_precipitation: f64,
    /// Forecast precipitation amount in mm.
    pub forecast_precipitation: f64,
    pub rain_in_region: bool,
    /// Rain rate in mm/hour, derived from the cumulative rain counter.
    pub rain_rate: f64,
    /// Average wind speed in m/s.
    pub wind_speed_avg: f64,
    pub connected: bool,
}

impl Default for SensorState {
    fn default() -> Self {
        SensorState {
            cloud_cover: DEFAULT_CLOUD_COVER,
            probability_of_precipitation: DEFAULT_PROBABILITY_OF_PRECIPITATION,
            forecast_precipitation: DEFAULT_FORECAST_PRECIPITATION,
            rain_in_region: true,
            rain_rate: DEFAULT_RAIN_RATE,
            wind_speed_avg: DEFAULT_WIND_SPEED_AVG,
            connected: false,
        }
    }
}

/// One reading of the cumulative rain counter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RainReading {
    /// Cumulative rainfall in mm
    pub total: f64,
    pub time: OffsetDateTime,
}
