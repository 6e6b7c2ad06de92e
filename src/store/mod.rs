//! Record Store
//!
//! Records are written in bulk into date-named partitions (`YYYY-MM-DD`). Old partitions are
//! expired at the end of every run.

pub mod persistence;

pub use persistence::SledDocumentStore;

use crate::error::StoreError;
use crate::record::{Record, RecordSet};
use chrono::{Days, NaiveDate};
use std::sync::Arc;
use tracing::{debug, info};

const PARTITION_FORMAT: &str = "%Y-%m-%d";

/// Document store interface
pub trait DocumentStore: Send + Sync {
    /// Write all `records` into `partition`, creating it if needed. Returns the number written.
    fn bulk_insert(&self, partition: &str, records: &[Record]) -> Result<usize, StoreError>;

    fn list_partitions(&self) -> Result<Vec<String>, StoreError>;

    /// Remove a partition and everything in it. Returns false if it did not exist.
    fn drop_partition(&self, partition: &str) -> Result<bool, StoreError>;

    /// Flush pending writes and release the store.
    fn close(&self) -> Result<(), StoreError>;
}

/// Partition holding the records of `date`.
pub fn partition_name(date: NaiveDate) -> String {
    date.format(PARTITION_FORMAT).to_string()
}

/// Parse a partition name back into its date. Names that are not dates yield `None`.
pub fn partition_date(name: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(name, PARTITION_FORMAT).ok()
}

/// Drop every date-named partition older than `retention_days` before `today`.
///
/// Partitions whose names are not dates are left alone. Returns the dropped names.
pub fn expire_partitions(
    store: &dyn DocumentStore,
    retention_days: u32,
    today: NaiveDate,
) -> Result<Vec<String>, StoreError> {
    let Some(cutoff) = today.checked_sub_days(Days::new(u64::from(retention_days))) else {
        // window reaches past the earliest representable date
        debug!(retention_days, "Retention window covers every partition");
        return Ok(Vec::new());
    };
    let mut dropped = Vec::new();
    for name in store.list_partitions()? {
        let Some(date) = partition_date(&name) else {
            debug!(partition = %name, "Ignoring non-date partition");
            continue;
        };
        if date < cutoff && store.drop_partition(&name)? {
            dropped.push(name);
        }
    }
    info!(
        retention_days,
        cutoff = %cutoff,
        dropped = dropped.len(),
        "Expired old partitions"
    );
    Ok(dropped)
}

/// Hands a run's deduplicated records to the store in one bulk insert.
pub struct RecordSink {
    store: Arc<dyn DocumentStore>,
}

impl RecordSink {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Persist `records` into the partition for `date`. An empty set writes nothing.
    pub fn persist(&self, records: &RecordSet, date: NaiveDate) -> Result<usize, StoreError> {
        if records.is_empty() {
            info!("No records to persist");
            return Ok(0);
        }

        let mut batch: Vec<Record> = records.iter().cloned().collect();
        batch.sort_by(|a, b| a.id().cmp(b.id()));
        let partition = partition_name(date);
        let written = self.store.bulk_insert(&partition, &batch)?;
        info!(partition = %partition, records = written, "Records persisted");
        Ok(written)
    }
}
