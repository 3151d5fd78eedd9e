pub mod aggregator;
pub mod rain_rate;
pub mod safety;

pub use aggregator::{SafetyStatus, StateAggregator};
pub use rain_rate::RainRateEstimator;
pub use safety::SafetyEvaluator;
