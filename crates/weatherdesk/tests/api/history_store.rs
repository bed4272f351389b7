use crate::helpers::{observation, spawn_store, ManualClock};
use std::fs;
use time::{macros::datetime, Duration};
use weatherdesk::{ExportFormat, HistoryError};

#[test]
fn append_then_query_returns_the_same_values() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::starting_at(datetime!(2024-07-01 09:30 UTC));
    let store = spawn_store(dir.path(), clock);

    let appended = store
        .append("Cairo", &observation("Cairo", 41.5, "Clear", 6.2))
        .unwrap();
    let rows = store.query(Some("Cairo"), 1).unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0], appended);
    assert_eq!(rows[0].temp, 41.5);
    assert_eq!(rows[0].wind_speed, 6.2);
    assert_eq!(rows[0].visibility_km, 10.0);
    assert_eq!(rows[0].conditions, "Clear");
}

#[test]
fn query_only_returns_one_city_inside_the_window() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::starting_at(datetime!(2024-01-01 00:00 UTC));
    let store = spawn_store(dir.path(), clock.clone());

    store.append("X", &observation("X", 1.0, "Snow", 1.0)).unwrap();
    clock.advance(Duration::days(45));
    store.append("X", &observation("X", 2.0, "Snow", 1.0)).unwrap();
    store.append("Y", &observation("Y", 3.0, "Snow", 1.0)).unwrap();
    clock.advance(Duration::hours(1));
    store.append("X", &observation("X", 4.0, "Snow", 1.0)).unwrap();

    let rows = store.query(Some("X"), 30).unwrap();
    assert_eq!(rows.iter().map(|r| r.temp).collect::<Vec<_>>(), vec![2.0, 4.0]);
    assert!(rows.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert!(rows.iter().all(|r| r.city == "X"));
}

#[test]
fn empty_store_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = spawn_store(dir.path(), ManualClock::starting_at(datetime!(2024-01-01 00:00 UTC)));
    assert!(store.query(None, 30).unwrap().is_empty());
    assert!(store.daily_summary(None, 30).unwrap().is_empty());
}

#[test]
fn prune_zero_then_long_query_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::starting_at(datetime!(2024-01-01 00:00 UTC));
    let store = spawn_store(dir.path(), clock.clone());

    for temp in [10.0, 11.0, 12.0] {
        store.append("Z", &observation("Z", temp, "Rain", 2.0)).unwrap();
    }
    clock.advance(Duration::milliseconds(1));

    assert_eq!(store.prune(0).unwrap(), 0);
    assert!(store.query(None, 3650).unwrap().is_empty());
}

#[test]
fn init_never_destroys_data() {
    let dir = tempfile::tempdir().unwrap();
    let store = spawn_store(dir.path(), ManualClock::starting_at(datetime!(2024-01-01 00:00 UTC)));
    store.append("Lima", &observation("Lima", 19.0, "Mist", 1.0)).unwrap();
    store.save_location("Lima").unwrap();

    for _ in 0..3 {
        store.init().unwrap();
    }
    assert_eq!(store.all_records().unwrap().len(), 1);
    assert_eq!(store.list_locations().unwrap(), vec!["Lima"]);
}

#[test]
fn externally_deleted_storage_is_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("weatherdesk");
    let store = spawn_store(&data_dir, ManualClock::starting_at(datetime!(2024-01-01 00:00 UTC)));
    fs::remove_dir_all(&data_dir).unwrap();

    store.append("Lima", &observation("Lima", 19.0, "Mist", 1.0)).unwrap();
    assert!(store.save_location("Lima").unwrap());
    assert_eq!(store.query(None, 1).unwrap().len(), 1);
}

#[test]
fn unrepairable_storage_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "file in the way").unwrap();

    let store = weatherdesk::HistoryStore::new(crate::helpers::test_logger(), blocker.join("data"));
    assert!(store.init().is_err());
    assert!(matches!(
        store.query(None, 30),
        Err(HistoryError::StorageUnavailable(_))
    ));
}

#[test]
fn export_and_backup_land_in_backups_folder() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::starting_at(datetime!(2024-02-29 23:59:59 UTC));
    let store = spawn_store(dir.path(), clock);
    store.append("Reykjavik", &observation("Reykjavik", -4.0, "Snow", 14.0)).unwrap();

    let csv = store.export(ExportFormat::Csv).unwrap();
    let parquet = store.export(ExportFormat::Parquet).unwrap();
    let xlsx = store.export(ExportFormat::Xlsx).unwrap();
    let backup = store.backup().unwrap();

    for path in [&csv, &parquet, &xlsx, &backup] {
        assert_eq!(path.parent().unwrap(), store.paths().backups);
        assert!(path.is_file());
    }
    assert_eq!(
        csv.file_name().unwrap().to_string_lossy(),
        "weather_history_20240229_235959.csv"
    );
    assert_eq!(
        backup.file_name().unwrap().to_string_lossy(),
        "weather_backup_20240229_235959.tar.gz"
    );
}
