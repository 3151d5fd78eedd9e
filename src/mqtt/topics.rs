/// Topic identities and routing of payloads to the aggregator
use std::collections::HashMap;
use time::OffsetDateTime;

use crate::error::MonitorError;
use crate::models::reading;
use crate::monitor::StateAggregator;
use crate::utils::decode_payload;

/// The sensor feeds the monitor subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    CloudCover,
    ProbabilityOfPrecipitation,
    RainEvent,
    ForecastPrecipitation,
    RainInRegion,
    WindSpeedAvg,
}

impl Topic {
    pub const ALL: [Topic; 6] = [
        Topic::CloudCover,
        Topic::ProbabilityOfPrecipitation,
        Topic::RainEvent,
        Topic::ForecastPrecipitation,
        Topic::RainInRegion,
        Topic::WindSpeedAvg,
    ];

    /// Environment variable holding the topic name
    pub fn env_key(self) -> &'static str {
        match self {
            Topic::CloudCover => "TOPIC_CLOUD_COVER",
            Topic::ProbabilityOfPrecipitation => "TOPIC_PROBABILITY_OF_PRECIPITATION",
            Topic::RainEvent => "TOPIC_EVENT_RAIN",
            Topic::ForecastPrecipitation => "TOPIC_FORECAST_PRECIPITATION",
            Topic::RainInRegion => "TOPIC_RAIN_IN_REGION",
            Topic::WindSpeedAvg => "TOPIC_WIND_SPEED_AVG",
        }
    }

    pub fn default_name(self) -> &'static str {
        match self {
            Topic::CloudCover => "weather/cloud_cover",
            Topic::ProbabilityOfPrecipitation => "weather/probability_of_precipitation",
            Topic::RainEvent => "weather/event_rain",
            Topic::ForecastPrecipitation => "weather/forecast_precipitation",
            Topic::RainInRegion => "weather/rain_in_region",
            Topic::WindSpeedAvg => "weather/wind_speed_avg",
        }
    }

    /// Name of the reading the feed carries
    pub fn reading(self) -> &'static str {
        match self {
            Topic::CloudCover => reading::CLOUD_COVER,
            Topic::ProbabilityOfPrecipitation => reading::PROBABILITY_OF_PRECIPITATION,
            Topic::RainEvent => reading::RAIN_EVENT,
            Topic::ForecastPrecipitation => reading::FORECAST_PRECIPITATION,
            Topic::RainInRegion => reading::RAIN_IN_REGION,
            Topic::WindSpeedAvg => reading::WIND_SPEED_AVG,
        }
    }
}

/// Maps configured topic names to the feed they carry
#[derive(Debug, Clone, Default)]
pub struct TopicMap {
    by_name: HashMap<String, Topic>,
}

impl TopicMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails if the name is already mapped to another feed.
    pub fn insert(&mut self, name: impl Into<String>, topic: Topic) -> Result<(), String> {
        let name = name.into();
        match self.by_name.get(&name) {
            Some(existing) if *existing != topic => Err(format!(
                "Topic '{}' configured for both {:?} and {:?}",
                name, existing, topic
            )),
            _ => {
                self.by_name.insert(name, topic);
                Ok(())
            }
        }
    }

    pub fn resolve(&self, name: &str) -> Option<Topic> {
        self.by_name.get(name).copied()
    }

    /// Topic names to subscribe to
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Apply one raw payload to the aggregator
///
/// `now` is the arrival time, used for the rain rate.
pub fn dispatch(
    aggregator: &StateAggregator,
    topic: Topic,
    payload: &[u8],
    now: OffsetDateTime,
) -> Result<(), MonitorError> {
    let text = decode_payload(topic.reading(), payload)?;

    match topic {
        Topic::CloudCover => aggregator.update_cloud_cover(text),
        Topic::ProbabilityOfPrecipitation => aggregator.update_probability_of_precipitation(text),
        Topic::RainEvent => aggregator.update_rain_event(text, now),
        Topic::ForecastPrecipitation => aggregator.update_forecast_precipitation(text),
        Topic::RainInRegion => {
            aggregator.update_rain_in_region(text);
            Ok(())
        }
        Topic::WindSpeedAvg => aggregator.update_wind_speed_avg(text),
    }
}
