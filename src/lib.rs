//! Weather safety gate for outdoor equipment.
//!
//! Sensor feeds arrive over MQTT and are folded into one [`SensorState`]
//! owned by a [`StateAggregator`], which answers whether it is currently safe
//! to operate.

pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod mqtt;
pub mod utils;

pub use config::MonitorConfig;
pub use error::MonitorError;
pub use models::SensorState;
pub use monitor::{RainRateEstimator, SafetyEvaluator, SafetyStatus, StateAggregator};
