/// Utility functions for payload decoding, unit conversion and formatting
use time::{format_description, OffsetDateTime};

use crate::error::MonitorError;

/// Multiplier from km/h to m/s
pub const KMH_TO_MS: f64 = 1000.0 / 3600.0;

/// Decode a raw message payload as UTF-8 text
pub fn decode_payload<'a>(reading: &'static str, payload: &'a [u8]) -> Result<&'a str, MonitorError> {
    std::str::from_utf8(payload)
        .map_err(|e| MonitorError::malformed(reading, &String::from_utf8_lossy(payload), e))
}

/// Parse a decimal reading from a text payload
///
/// Surrounding whitespace is ignored. Text that is not a number, or that
/// parses to NaN or an infinity, is rejected as malformed.
pub fn parse_reading(reading: &'static str, payload: &str) -> Result<f64, MonitorError> {
    let value: f64 = payload
        .trim()
        .parse()
        .map_err(|e| MonitorError::malformed(reading, payload, e))?;

    if !value.is_finite() {
        return Err(MonitorError::malformed(reading, payload, "value is not finite"));
    }

    Ok(value)
}

/// Only the exact literal "true" counts as set.
pub fn parse_flag(payload: &str) -> bool {
    payload == "true"
}

pub fn kmh_to_ms(kmh: f64) -> f64 {
    kmh * KMH_TO_MS
}

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    match format_description::parse("[day].[month].[year] - [hour]:[minute]:[second]") {
        Ok(format) => dt.format(&format).unwrap_or_else(|_| dt.to_string()),
        Err(_) => dt.to_string(),
    }
}
