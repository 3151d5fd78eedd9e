use thiserror::Error;

/// Errors raised at the update boundary of the aggregator.
///
/// A failed update never touches the shared state; the previous value of the
/// affected reading stays in effect.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MonitorError {
    /// A payload did not decode to the value type its topic carries.
    #[error("malformed {reading} payload {payload:?}: {reason}")]
    MalformedPayload {
        /// Name of the reading the payload was meant for.
        reading: &'static str,
        payload: String,
        reason: String,
    },
}

impl MonitorError {
    pub fn malformed(reading: &'static str, payload: &str, reason: impl ToString) -> Self {
        MonitorError::MalformedPayload {
            reading,
            payload: payload.to_string(),
            reason: reason.to_string(),
        }
    }
}
