use log::{debug, info};
use std::env;
use std::time::Duration;
use url::Url;

use crate::monitor::safety::DEFAULT_PRECIPITATION_PROBABILITY_LIMIT;
use crate::mqtt::topics::{Topic, TopicMap};

const DEFAULT_MQTT_URL: &str = "mqtt://localhost:1883";
const DEFAULT_MQTT_PORT: u16 = 1883;
const DEFAULT_CLIENT_ID: &str = "MQTTSafetyMonitor";
const DEFAULT_LIVENESS_TOPIC: &str = "client/mqtt-safety-monitor";
const DEFAULT_STATUS_INTERVAL_SECS: u64 = 60;
const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: String,
    /// Retained liveness marker, "True" while running and "False" as last will
    pub liveness_topic: String,
    pub topics: TopicMap,
    pub precipitation_probability_limit: f64,
    pub status_interval: Duration,
    pub reconnect_delay: Duration,
}

impl MonitorConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from a key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mqtt_url = lookup("MQTT_URL").unwrap_or_else(|| DEFAULT_MQTT_URL.to_string());
        let url = Url::parse(&mqtt_url).map_err(|e| format!("Invalid MQTT_URL '{}': {}", mqtt_url, e))?;

        match url.scheme() {
            "mqtt" | "tcp" => {}
            other => return Err(format!("Unsupported MQTT_URL scheme '{}', expected mqtt://", other).into()),
        }

        let broker_host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err("MQTT_URL has no broker host".into()),
        };
        let broker_port = url.port().unwrap_or(DEFAULT_MQTT_PORT);

        // Explicit variables win over credentials embedded in the URL
        let username = lookup("MQTT_USER").or_else(|| {
            Some(url.username().to_string()).filter(|user| !user.is_empty())
        });
        let password = lookup("MQTT_PASSWORD").or_else(|| url.password().map(str::to_string));

        let client_id = lookup("MQTT_CLIENT_ID").unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string());
        let liveness_topic =
            lookup("LIVENESS_TOPIC").unwrap_or_else(|| DEFAULT_LIVENESS_TOPIC.to_string());

        let mut topics = TopicMap::new();
        for topic in Topic::ALL {
            let name = lookup(topic.env_key()).unwrap_or_else(|| topic.default_name().to_string());
            if name.trim().is_empty() {
                return Err(format!("{} must not be empty", topic.env_key()).into());
            }
            debug!("Topic {:?} -> '{}'", topic, name);
            topics.insert(name, topic)?;
        }

        let precipitation_probability_limit = match lookup("LIMIT_PRECIPITATION_PROBABILITY") {
            Some(value) => {
                let limit: f64 = value
                    .trim()
                    .parse()
                    .map_err(|_| format!("LIMIT_PRECIPITATION_PROBABILITY '{}' is not a number", value))?;
                if !limit.is_finite() {
                    return Err("LIMIT_PRECIPITATION_PROBABILITY must be finite".into());
                }
                limit
            }
            None => DEFAULT_PRECIPITATION_PROBABILITY_LIMIT,
        };

        let status_interval = Duration::from_secs(parse_secs(
            &lookup,
            "STATUS_INTERVAL_SECS",
            DEFAULT_STATUS_INTERVAL_SECS,
        )?);
        let reconnect_delay = Duration::from_secs(parse_secs(
            &lookup,
            "RECONNECT_DELAY_SECS",
            DEFAULT_RECONNECT_DELAY_SECS,
        )?);

        info!(
            "Broker {}:{} as '{}', {} topics, precipitation probability limit {}%",
            broker_host,
            broker_port,
            client_id,
            topics.len(),
            precipitation_probability_limit
        );

        Ok(MonitorConfig {
            broker_host,
            broker_port,
            username,
            password,
            client_id,
            liveness_topic,
            topics,
            precipitation_probability_limit,
            status_interval,
            reconnect_delay,
        })
    }
}

fn parse_secs<F>(lookup: &F, key: &str, default: u64) -> Result<u64, Box<dyn std::error::Error>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => match value.trim().parse::<u64>() {
            Ok(0) => Err(format!("{} must be at least 1", key).into()),
            Ok(secs) => Ok(secs),
            Err(_) => Err(format!("{} '{}' is not a whole number of seconds", key, value).into()),
        },
        None => Ok(default),
    }
}
