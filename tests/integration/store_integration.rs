//! Integration tests for the sled-backed record store

use augur::record::{Media, Record, RecordSet};
use augur::store::{expire_partitions, DocumentStore, RecordSink, SledDocumentStore};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::TempDir;

fn day(month: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, d).unwrap()
}

fn forecast(title: &str, date: NaiveDate) -> Record {
    Record::new(title, "gold", format!("{} will rise", title), date)
        .with_media(Some(Media::Url(format!("https://img.example/{}", title))))
        .with_urls(vec![format!("https://news.example/{}", title)])
        .with_labels(BTreeSet::from(["gold".to_string(), "rise".to_string()]))
        .with_tags(BTreeSet::from(["forecast".to_string()]))
}

/// A persisted record comes back with every field intact
#[test]
fn test_sink_persists_full_records() {
    let store_dir = TempDir::new().unwrap();
    let store = Arc::new(SledDocumentStore::open(store_dir.path()).unwrap());
    let record = forecast("gold outlook", day(9, 1));
    let id = record.id().clone();
    let records: RecordSet = vec![record.clone(), forecast("silver outlook", day(9, 1))]
        .into_iter()
        .collect();

    let written = RecordSink::new(store.clone())
        .persist(&records, day(9, 1))
        .unwrap();
    assert_eq!(written, 2);

    let stored = store.get("2024-09-01", &id).unwrap().unwrap();
    assert_eq!(stored.title(), "gold outlook");
    assert_eq!(stored.content(), "gold outlook will rise");
    assert_eq!(stored.date(), day(9, 1));
    assert_eq!(
        stored.media(),
        Some(&Media::Url("https://img.example/gold outlook".to_string()))
    );
    assert_eq!(stored.urls(), record.urls());
    assert_eq!(stored.labels(), record.labels());
    assert_eq!(stored.tags(), record.tags());
    assert_eq!(store.records("2024-09-01").unwrap().len(), 2);
}

/// Two runs on the same day share a partition; identity keys keep both sets
#[test]
fn test_same_day_runs_accumulate() {
    let store_dir = TempDir::new().unwrap();
    let store = Arc::new(SledDocumentStore::open(store_dir.path()).unwrap());
    let sink = RecordSink::new(store.clone());

    for title in ["morning", "evening"] {
        let records: RecordSet = std::iter::once(forecast(title, day(9, 1))).collect();
        sink.persist(&records, day(9, 1)).unwrap();
    }

    let mut titles: Vec<String> = store
        .records("2024-09-01")
        .unwrap()
        .iter()
        .map(|r| r.title().to_string())
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["evening".to_string(), "morning".to_string()]);
}

#[test]
fn test_empty_set_creates_no_partition() {
    let store_dir = TempDir::new().unwrap();
    let store = Arc::new(SledDocumentStore::open(store_dir.path()).unwrap());

    let written = RecordSink::new(store.clone())
        .persist(&RecordSet::new(), day(9, 1))
        .unwrap();

    assert_eq!(written, 0);
    assert!(store.list_partitions().unwrap().is_empty());
}

/// Retention keeps the cutoff day itself and drops everything before it
#[test]
fn test_expiry_against_sled_partitions() {
    let store_dir = TempDir::new().unwrap();
    let store = SledDocumentStore::open(store_dir.path()).unwrap();
    for date in [day(7, 1), day(8, 1), day(8, 2), day(8, 31)] {
        let name = date.format("%Y-%m-%d").to_string();
        store.bulk_insert(&name, &[forecast("old", date)]).unwrap();
    }
    store.bulk_insert("archive", &[forecast("kept", day(1, 1))]).unwrap();

    let dropped = expire_partitions(&store, 30, day(9, 1)).unwrap();

    assert_eq!(dropped, vec!["2024-07-01".to_string(), "2024-08-01".to_string()]);
    assert_eq!(
        store.list_partitions().unwrap(),
        vec![
            "2024-08-02".to_string(),
            "2024-08-31".to_string(),
            "archive".to_string()
        ]
    );
    assert!(store.records("2024-08-01").unwrap().is_empty());
}

#[test]
fn test_close_flushes_and_blocks_writes() {
    let store_dir = TempDir::new().unwrap();
    let store = SledDocumentStore::open(store_dir.path()).unwrap();
    store
        .bulk_insert("2024-09-01", &[forecast("final", day(9, 1))])
        .unwrap();

    store.close().unwrap();
    store.close().unwrap();

    assert!(store
        .bulk_insert("2024-09-01", &[forecast("late", day(9, 1))])
        .is_err());
    assert!(store.drop_partition("2024-09-01").is_err());
    assert_eq!(store.records("2024-09-01").unwrap().len(), 1);
}
