use log::{error, info, warn};
use std::sync::Arc;
use tokio::time::interval;

use mqtt_safety_monitor::mqtt::client::{connect, run_event_loop, shutdown};
use mqtt_safety_monitor::{MonitorConfig, SafetyEvaluator, StateAggregator};

/// Periodically log connection state and the safety decision
async fn report_status(aggregator: Arc<StateAggregator>, period: std::time::Duration) {
    let mut ticker = interval(period);

    loop {
        ticker.tick().await;

        let status = aggregator.status();
        let safe = status.safe;
        if status.state.connected {
            info!("Status: connected, {}", if safe { "safe" } else { "unsafe" });
        } else {
            warn!(
                "Status: disconnected, safety value ({}) must not be trusted",
                if safe { "safe" } else { "unsafe" }
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match MonitorConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    info!("Starting MQTT safety monitor");

    let aggregator = Arc::new(StateAggregator::new(SafetyEvaluator::new(
        config.precipitation_probability_limit,
    )));

    let (client, mut eventloop) = connect(&config);

    let status_task = tokio::spawn(report_status(
        Arc::clone(&aggregator),
        config.status_interval,
    ));

    // Run the event loop until Ctrl+C
    tokio::select! {
        _ = run_event_loop(&client, &mut eventloop, &config, &aggregator) => {}
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Program terminated by user. Exiting gracefully."),
                Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
            }
        }
    }

    status_task.abort();
    shutdown(&client, &mut eventloop, &config).await;
    aggregator.set_connected(false);

    Ok(())
}
