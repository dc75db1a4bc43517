use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use ecotide::clock::ManualClock;
use ecotide::store::{JsonFileStore, KeyValueStore, StoreKey};
use ecotide::{EcoStore, Grade, ScoreResult, SettingsPatch};
use serde_json::{json, Value};

fn scratch_path(test: &str) -> PathBuf {
    let unique = format!(
        "ecotide-{test}-{}-{}",
        std::process::id(),
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    );
    std::env::temp_dir().join(unique).join("store.json")
}

fn graded(grade: Grade) -> ScoreResult {
    let mut result = ScoreResult::fallback("unused");
    result.grade = grade;
    result.co2_impact = "0.8 kg CO2".to_string();
    result.message = None;
    result.is_fallback = false;
    result
}

fn open(path: &Path, now: i64) -> EcoStore {
    let backend = JsonFileStore::open(path).expect("open store");
    EcoStore::new(Arc::new(backend), Arc::new(ManualClock::starting_at(now)))
}

#[test]
fn state_survives_reopening_the_document() {
    let path = scratch_path("reopen");

    let first = open(&path, 1_700_000_000_000);
    first.cache().put("B0AAA11111:Bamboo Toothbrush", graded(Grade::A));
    first.record_view("Bamboo Toothbrush", &graded(Grade::A));
    first.settings().update(SettingsPatch {
        auto_scan: Some(false),
        api_endpoint: Some("https://scores.example.org/".to_string()),
        ..SettingsPatch::default()
    });

    let second = open(&path, 1_700_000_060_000);
    assert_eq!(
        second
            .cache()
            .get("B0AAA11111:Bamboo Toothbrush")
            .map(|result| result.grade),
        Some(Grade::A)
    );
    let history = second.history().all();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].timestamp_epoch_millis, 1_700_000_000_000);

    let settings = second.settings().get();
    assert!(!settings.auto_scan);
    assert!(settings.notifications_enabled);
    assert_eq!(settings.api_endpoint, "https://scores.example.org");
    assert_eq!(second.progress().get().total_products, 1);

    if let Some(dir) = path.parent() {
        let _ = fs::remove_dir_all(dir);
    }
}

#[test]
fn document_uses_the_extension_key_names() {
    let path = scratch_path("keys");
    let store = open(&path, 1_700_000_000_000);
    store.record_view("Hemp Tote", &graded(Grade::B));
    store.cache().put("Hemp Tote", graded(Grade::B));
    store.settings().update(SettingsPatch {
        notifications_enabled: Some(false),
        ..SettingsPatch::default()
    });

    let raw: Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("read store")).expect("json");
    for key in ["ecoData", "sustainabilityCache", "userProgress", "settings"] {
        assert!(raw.get(key).is_some(), "missing top-level key {key}");
    }
    assert_eq!(raw["ecoData"][0]["timestamp"], Value::from(1_700_000_000_000_i64));
    assert_eq!(raw["settings"]["notificationsEnabled"], Value::Bool(false));

    if let Some(dir) = path.parent() {
        let _ = fs::remove_dir_all(dir);
    }
}

#[test]
fn corrupt_document_reads_as_empty_and_is_replaced_on_write() {
    let path = scratch_path("corrupt");
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).expect("scratch dir");
    }
    fs::write(&path, "{ not json").expect("seed corrupt store");

    let backend = JsonFileStore::open(&path).expect("corrupt document still opens");
    assert!(backend.load(StoreKey::EcoData).is_err());

    let store = EcoStore::new(Arc::new(backend), Arc::new(ManualClock::starting_at(5)));
    assert!(store.history().all().is_empty());

    store.record_view("Cork Yoga Mat", &graded(Grade::A));
    assert_eq!(store.history().all().len(), 1);

    if let Some(dir) = path.parent() {
        let _ = fs::remove_dir_all(dir);
    }
}

#[test]
fn clearing_history_removes_the_key() {
    let path = scratch_path("clear");
    let store = open(&path, 10);
    store.record_view("Cork Yoga Mat", &graded(Grade::A));
    store.history().clear();

    let reopened = JsonFileStore::open(&path).expect("reopen");
    assert_eq!(reopened.load(StoreKey::EcoData).expect("load"), None);

    if let Some(dir) = path.parent() {
        let _ = fs::remove_dir_all(dir);
    }
}

#[test]
fn concurrent_handles_keep_each_others_writes() {
    const WRITES: i64 = 200;
    let path = scratch_path("concurrent");

    let writers: Vec<_> = [StoreKey::Settings, StoreKey::SustainabilityCache]
        .into_iter()
        .map(|key| {
            let store = JsonFileStore::open(&path).expect("open store");
            thread::spawn(move || {
                (0..WRITES)
                    .filter(|round| store.save(key, json!({ "round": round })).is_err())
                    .count()
            })
        })
        .collect();

    for writer in writers {
        assert_eq!(writer.join().expect("writer thread"), 0, "no write is dropped");
    }

    let reopened = JsonFileStore::open(&path).expect("reopen");
    for key in [StoreKey::Settings, StoreKey::SustainabilityCache] {
        assert_eq!(
            reopened.load(key).expect("load"),
            Some(json!({ "round": WRITES - 1 })),
            "last write to {key} survives the other handle's writes"
        );
    }

    if let Some(dir) = path.parent() {
        let _ = fs::remove_dir_all(dir);
    }
}
