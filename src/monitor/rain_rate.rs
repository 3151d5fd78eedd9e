/// Rain rate derivation from a cumulative rain counter
use time::OffsetDateTime;

use crate::models::RainReading;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Derives an instantaneous rain rate from successive counter readings.
///
/// The counter is a monotonically increasing totaliser in mm. A reading lower
/// than its predecessor means the counter was reset, and yields a rate of
/// zero instead of a negative one.
#[derive(Debug, Clone, Default)]
pub struct RainRateEstimator {
    previous: Option<RainReading>,
    current: Option<RainReading>,
}

impl RainRateEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a counter reading taken at `now` and return the rate in mm/hour
    ///
    /// Returns 0 for the first reading and whenever `now` equals the time of
    /// the previous reading, since no interval is defined in either case.
    pub fn observe(&mut self, total: f64, now: OffsetDateTime) -> f64 {
        self.previous = self.current.take();
        self.current = Some(RainReading { total, time: now });

        let previous = match self.previous {
            Some(previous) if previous.time != now => previous,
            _ => return 0.0,
        };

        let elapsed = (now - previous.time).as_seconds_f64();
        let rate = ((total - previous.total) / elapsed).max(0.0);

        rate * SECONDS_PER_HOUR
    }
}
