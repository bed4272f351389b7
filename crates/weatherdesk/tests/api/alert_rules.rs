use weatherdesk::{evaluate, AlertKind, ObservationError, Temperature, HIGH_WIND_MS};

use crate::helpers::observation;

#[test]
fn temperature_alerts_follow_the_strict_band() {
    let mut temp = -30.0;
    while temp <= 50.0 {
        let alerts = evaluate(&observation("Test", temp, "Clear", 0.0)).unwrap();
        let kinds = alerts.kinds();
        assert_eq!(
            kinds.contains(&AlertKind::HighTemperature),
            temp > 35.0,
            "high at {}",
            temp
        );
        assert_eq!(
            kinds.contains(&AlertKind::LowTemperature),
            temp < 5.0,
            "low at {}",
            temp
        );
        temp += 0.5;
    }
}

#[test]
fn wind_alert_fires_only_above_threshold() {
    for wind in [0.0, 3.3, 9.99, HIGH_WIND_MS, 10.01, 25.0] {
        let alerts = evaluate(&observation("Test", 20.0, "Clear", wind)).unwrap();
        assert_eq!(alerts.kinds().contains(&AlertKind::HighWind), wind > HIGH_WIND_MS);
    }
    assert!(matches!(
        evaluate(&observation("Test", 20.0, "Clear", -0.1)),
        Err(ObservationError::InvalidValue { .. })
    ));
}

#[test]
fn stormy_hot_windy_day_raises_three_ordered_alerts() {
    let alerts = evaluate(&observation("Test", 38.0, "Thunderstorm", 12.0)).unwrap();
    assert_eq!(
        alerts.messages(),
        vec![
            "High temperature warning: 38°C",
            "Weather alert: Thunderstorm",
            "High wind warning: 12 m/s",
        ]
    );
}

#[test]
fn mild_day_raises_nothing() {
    let mut obs = observation("Test", 15.0, "Clear", 5.0);
    assert!(evaluate(&obs).unwrap().is_empty());

    obs.temperature = Temperature::fahrenheit(59.0);
    assert!(evaluate(&obs).unwrap().is_empty());
}
