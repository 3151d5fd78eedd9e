/// MQTT transport: connection, liveness marker and message routing
use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, LastWill, MqttOptions, Outgoing, Packet, QoS};
use time::OffsetDateTime;
use tokio::time::{sleep, timeout, Duration};

use crate::config::MonitorConfig;
use crate::monitor::StateAggregator;
use crate::mqtt::topics::{dispatch, TopicMap};

const KEEP_ALIVE_SECS: u64 = 60;
const SHUTDOWN_FLUSH_SECS: u64 = 2;

// Requests issued while handling a ConnAck (one subscribe per topic plus the
// liveness publish) are queued before the event loop is polled again, so the
// channel must hold all of them.
const REQUEST_CHANNEL_CAPACITY: usize = 20;

const ALIVE: &str = "True";
const DEAD: &str = "False";

/// Build client options, including the retained last will on the liveness topic
pub fn mqtt_options(config: &MonitorConfig) -> MqttOptions {
    let mut options = MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
    options.set_keep_alive(Duration::from_secs(KEEP_ALIVE_SECS));

    if let Some(username) = &config.username {
        options.set_credentials(username, config.password.as_deref().unwrap_or_default());
    }

    options.set_last_will(LastWill::new(
        &config.liveness_topic,
        DEAD,
        QoS::AtLeastOnce,
        true,
    ));

    options
}

/// Create the client handle and its event loop. Nothing is sent until the
/// event loop is polled.
pub fn connect(config: &MonitorConfig) -> (AsyncClient, EventLoop) {
    AsyncClient::new(mqtt_options(config), REQUEST_CHANNEL_CAPACITY)
}

/// Drive the connection forever, feeding sensor payloads into `aggregator`
///
/// The client reconnects on the next poll after an error; every ConnAck
/// re-subscribes and re-announces liveness since the broker may have dropped
/// the session.
pub async fn run_event_loop(
    client: &AsyncClient,
    eventloop: &mut EventLoop,
    config: &MonitorConfig,
    aggregator: &StateAggregator,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                handle_publish(
                    &config.topics,
                    aggregator,
                    &publish.topic,
                    &publish.payload,
                    OffsetDateTime::now_utc(),
                );
            }
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                info!(
                    "[mqtt] connected rc = {:?}, session present = {}",
                    ack.code, ack.session_present
                );
                aggregator.set_connected(true);
                subscribe_all(client, &config.topics).await;
                announce(client, &config.liveness_topic, ALIVE).await;
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                warn!("[mqtt] disconnected by broker");
                aggregator.set_connected(false);
            }
            Ok(_) => {}
            Err(e) => {
                error!("[mqtt] connection error: {}", e);
                if aggregator.connected() {
                    aggregator.set_connected(false);
                }
                sleep(config.reconnect_delay).await;
            }
        }
    }
}

/// Mark the monitor as gone and disconnect cleanly
pub async fn shutdown(client: &AsyncClient, eventloop: &mut EventLoop, config: &MonitorConfig) {
    announce(client, &config.liveness_topic, DEAD).await;
    if let Err(e) = client.disconnect().await {
        warn!("[mqtt] disconnect request failed: {}", e);
        return;
    }

    // Keep polling so the queued publish and disconnect actually go out
    let flush = async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!("[mqtt] connection closed during shutdown: {}", e);
                    break;
                }
            }
        }
    };

    if timeout(Duration::from_secs(SHUTDOWN_FLUSH_SECS), flush).await.is_err() {
        warn!("[mqtt] timed out flushing shutdown messages");
    }
}

/// Route one incoming message; problems are logged and absorbed
pub(crate) fn handle_publish(
    topics: &TopicMap,
    aggregator: &StateAggregator,
    topic_name: &str,
    payload: &[u8],
    now: OffsetDateTime,
) {
    let Some(topic) = topics.resolve(topic_name) else {
        debug!("[mqtt] ignoring message on unknown topic '{}'", topic_name);
        return;
    };

    // The aggregator already logged the rejection
    if let Err(e) = dispatch(aggregator, topic, payload, now) {
        debug!("[mqtt] dropped update on '{}': {}", topic_name, e);
    }
}

async fn subscribe_all(client: &AsyncClient, topics: &TopicMap) {
    for name in topics.names() {
        match client.subscribe(name, QoS::AtMostOnce).await {
            Ok(()) => debug!("[mqtt] subscribed to {}", name),
            Err(e) => error!("[mqtt] subscribe to {} failed: {}", name, e),
        }
    }
}

async fn announce(client: &AsyncClient, liveness_topic: &str, status: &'static str) {
    if let Err(e) = client
        .publish(liveness_topic, QoS::AtLeastOnce, true, status)
        .await
    {
        error!("[mqtt] publishing liveness '{}' failed: {}", status, e);
    }
}
