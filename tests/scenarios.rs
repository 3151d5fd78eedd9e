//! End-to-end scenarios through the aggregator's public operations.

use mqtt_safety_monitor::mqtt::{dispatch, Topic};
use mqtt_safety_monitor::{SafetyEvaluator, SensorState, StateAggregator};
use time::{Duration, OffsetDateTime};

fn at(secs: i64) -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH + Duration::seconds(secs)
}

/// Feed a full set of benign readings with the given wind speed (km/h)
fn clear_night(wind_kmh: &str) -> StateAggregator {
    let aggregator = StateAggregator::new(SafetyEvaluator::new(5.0));
    aggregator.set_connected(true);
    aggregator.update_cloud_cover("40").unwrap();
    aggregator.update_probability_of_precipitation("3").unwrap();
    aggregator.update_rain_event("0.0", at(0)).unwrap();
    aggregator.update_rain_event("0.0", at(10)).unwrap();
    aggregator.update_forecast_precipitation("0").unwrap();
    aggregator.update_rain_in_region("false");
    aggregator.update_wind_speed_avg(wind_kmh).unwrap();
    aggregator
}

#[test]
fn fresh_monitor_reports_unsafe() {
    let aggregator = StateAggregator::default();
    assert!(!aggregator.is_safe());
    assert!(!aggregator.connected());
}

#[test]
fn calm_clear_conditions_are_safe() {
    let aggregator = clear_night("5");
    let state = aggregator.snapshot();
    assert!((state.wind_speed_avg - 1.39).abs() < 0.01);
    assert_eq!(state.rain_rate, 0.0);
    assert!(aggregator.is_safe());
}

#[test]
fn strong_wind_is_unsafe() {
    let aggregator = clear_night("40");
    assert!((aggregator.snapshot().wind_speed_avg - 11.1).abs() < 0.02);
    assert!(!aggregator.is_safe());
}

#[test]
fn malformed_cloud_cover_keeps_prior_value() {
    let aggregator = clear_night("5");
    assert!(aggregator.update_cloud_cover("abc").is_err());
    assert_eq!(aggregator.snapshot().cloud_cover, 40.0);
    assert!(aggregator.is_safe());
}

#[test]
fn any_missing_input_keeps_it_unsafe() {
    // Same as the safe scenario but each time with one feed never received
    let steps: [(Topic, &[u8]); 6] = [
        (Topic::CloudCover, b"40"),
        (Topic::ProbabilityOfPrecipitation, b"3"),
        (Topic::RainEvent, b"0.0"),
        (Topic::ForecastPrecipitation, b"0"),
        (Topic::RainInRegion, b"false"),
        (Topic::WindSpeedAvg, b"5"),
    ];

    for skipped in Topic::ALL {
        let aggregator = StateAggregator::default();
        for (topic, payload) in steps.iter().filter(|(topic, _)| *topic != skipped) {
            dispatch(&aggregator, *topic, payload, at(0)).unwrap();
        }
        assert!(!aggregator.is_safe(), "safe without {:?}", skipped);
    }
}

#[test]
fn rain_starting_makes_it_unsafe() {
    let aggregator = clear_night("5");
    aggregator.update_rain_event("0.2", at(70)).unwrap();
    assert!(aggregator.snapshot().rain_rate > 0.0);
    assert!(!aggregator.is_safe());

    // Counter stays put: rate falls back to zero
    aggregator.update_rain_event("0.2", at(130)).unwrap();
    assert!(aggregator.is_safe());
}

#[test]
fn counter_reset_does_not_report_rain() {
    let aggregator = clear_night("5");
    aggregator.update_rain_event("12.4", at(100)).unwrap();
    aggregator.update_rain_event("0.0", at(160)).unwrap();
    assert_eq!(aggregator.snapshot().rain_rate, 0.0);
}

#[test]
fn disconnect_keeps_last_values() {
    let aggregator = clear_night("5");
    aggregator.set_connected(false);

    let state = aggregator.snapshot();
    assert!(!state.connected);
    assert_eq!(
        SensorState {
            connected: true,
            ..state
        },
        clear_night("5").snapshot()
    );
    // Callers gate on `connected`; the decision itself is unchanged
    assert!(aggregator.is_safe());
}

#[test]
fn fully_overcast_reading_counts_as_missing() {
    let aggregator = clear_night("5");
    aggregator.update_cloud_cover("100").unwrap();
    assert!(!aggregator.is_safe());
}

#[test]
fn configured_limit_is_honoured() {
    let strict = StateAggregator::new(SafetyEvaluator::new(2.0));
    strict.update_cloud_cover("10").unwrap();
    strict.update_probability_of_precipitation("3").unwrap();
    strict.update_rain_event("0", at(0)).unwrap();
    strict.update_forecast_precipitation("0").unwrap();
    strict.update_rain_in_region("false");
    strict.update_wind_speed_avg("0").unwrap();
    assert_eq!(strict.precipitation_probability_limit(), 2.0);
    assert!(!strict.is_safe());

    strict.update_probability_of_precipitation("2").unwrap();
    assert!(strict.is_safe());
}
