//! File-backed Store Integration Tests
//!
//! Runs the repair against a settings table persisted on disk.

mod common;

use common::{FailingStore, RepairFixture, affected_backup, corrupted_rows};
use serde_json::{Value, json};
use settings_repair::{
    AccessContext, JsonFileSettingsStore, RepairOutcome, RunOptions, SettingRecord,
    SettingsCache, SettingsStore, SettingsTransaction,
};

#[test]
fn test_repair_persists_to_settings_file() {
    let fixture = RepairFixture::new();
    fixture.write_backup("ghost.2018-12-01.json", &affected_backup());

    let store = JsonFileSettingsStore::new(fixture.content_path().join("settings.json"));
    store.save(&corrupted_rows()).unwrap();
    fixture.cache.populate(&store.load().unwrap()).unwrap();

    let outcome = fixture.repair().run(&store, &RunOptions::internal()).unwrap();
    assert_eq!(outcome.reverted().len(), 3);

    // A fresh read of the file agrees with the cache
    let rows = store.load().unwrap();
    for key in ["is_private", "force_i18n", "amp"] {
        let row = rows.iter().find(|r| r.key == key).unwrap();
        assert!(row.value_is("true"), "{key} on disk");
        assert_eq!(
            fixture.cache.get(key).unwrap().unwrap().value,
            serde_json::Value::Bool(true)
        );
    }
    let title = rows.iter().find(|r| r.key == "title").unwrap();
    assert!(title.value_is("My Blog"));
}

#[test]
fn test_repair_rewrites_only_reverted_values() {
    let fixture = RepairFixture::new();
    fixture.write_backup("ghost.2018-12-01.json", &affected_backup());

    let path = fixture.content_path().join("settings.json");
    let original = json!([
        {"id": 1, "group": "core", "key": "title", "value": "My Blog", "type": "blog",
         "flags": "PUBLIC", "created_at": "2017-03-01 08:00:00", "created_by": 1},
        {"id": 2, "group": "private", "key": "is_private", "value": "false", "type": "private",
         "created_at": "2017-03-01 08:00:00", "updated_at": 1543622400000u64},
        {"id": 3, "group": "amp", "key": "amp", "value": "false", "type": "blog",
         "flags": "PUBLIC", "created_at": "2017-03-01 08:00:00"}
    ]);
    std::fs::write(&path, serde_json::to_string_pretty(&original).unwrap()).unwrap();
    let store = JsonFileSettingsStore::new(&path);

    let outcome = fixture.repair().run(&store, &RunOptions::internal()).unwrap();
    assert_eq!(outcome.reverted(), ["is_private".to_string(), "amp".to_string()]);

    let mut expected = original.clone();
    expected[1]["value"] = Value::from("true");
    expected[2]["value"] = Value::from("true");
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        serde_json::to_string_pretty(&expected).unwrap()
    );
}

#[test]
fn test_noop_run_does_not_rewrite_file() {
    let fixture = RepairFixture::new();
    let path = fixture.content_path().join("settings.json");
    let store = JsonFileSettingsStore::new(&path);
    store.save(&corrupted_rows()).unwrap();
    let before = std::fs::read_to_string(&path).unwrap();

    let outcome = fixture.repair().run(&store, &RunOptions::internal()).unwrap();

    assert_eq!(outcome, RepairOutcome::NoBackup);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn test_rows_round_trip_through_file() {
    let fixture = RepairFixture::new();
    let store = JsonFileSettingsStore::new(fixture.content_path().join("settings.json"));
    let rows = corrupted_rows();

    store.save(&rows).unwrap();

    assert_eq!(store.load().unwrap(), rows);
}

#[test]
fn test_failed_update_leaves_rows_unchanged() {
    let fixture = RepairFixture::new();
    fixture.write_backup("ghost.2018-12-01.json", &affected_backup());
    let store = FailingStore::failing_update(
        vec![
            SettingRecord::new("is_private", "false"),
            SettingRecord::new("amp", "false"),
        ],
        "is_private",
    );

    assert!(fixture.repair().run(&store, &RunOptions::internal()).is_err());

    let tx = store.begin(&AccessContext::internal()).unwrap();
    assert!(tx.read_all().unwrap().iter().all(|r| r.value_is("false")));
}
