//! Sled-backed document store

use crate::error::StoreError;
use crate::record::{Record, RecordId};
use crate::store::DocumentStore;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Name sled gives the tree opened by `sled::open`; it never holds records.
const DEFAULT_TREE: &[u8] = b"__sled__default";

/// One sled tree per partition, keyed by record id, values bincode-encoded.
///
/// After [`DocumentStore::close`] the store rejects writes; reads still see the flushed data.
pub struct SledDocumentStore {
    db: sled::Db,
    closed: AtomicBool,
}

impl SledDocumentStore {
    /// Open (or create) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            StoreError::StoreUnavailable(format!(
                "Failed to open sled database at {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        info!(path = %path.as_ref().display(), "Document store opened");
        Ok(Self {
            db,
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::StoreUnavailable("store is closed".to_string()));
        }
        Ok(())
    }

    fn tree(&self, partition: &str) -> Result<sled::Tree, StoreError> {
        if partition.trim().is_empty() || partition.as_bytes() == DEFAULT_TREE {
            return Err(StoreError::InvalidPartition(partition.to_string()));
        }
        Ok(self.db.open_tree(partition)?)
    }

    /// Reads never create a partition.
    fn existing_tree(&self, partition: &str) -> Result<Option<sled::Tree>, StoreError> {
        let exists = self
            .db
            .tree_names()
            .iter()
            .any(|name| &name[..] == partition.as_bytes());
        if !exists {
            return Ok(None);
        }
        self.tree(partition).map(Some)
    }

    pub fn get(&self, partition: &str, id: &RecordId) -> Result<Option<Record>, StoreError> {
        let Some(tree) = self.existing_tree(partition)? else {
            return Ok(None);
        };
        match tree.get(id.as_str())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Every record in `partition`, in id order. A missing partition reads as empty.
    pub fn records(&self, partition: &str) -> Result<Vec<Record>, StoreError> {
        let mut records = Vec::new();
        let Some(tree) = self.existing_tree(partition)? else {
            return Ok(records);
        };
        for item in tree.iter() {
            let (_, value) = item?;
            records.push(bincode::deserialize(&value)?);
        }
        Ok(records)
    }
}

impl DocumentStore for SledDocumentStore {
    fn bulk_insert(&self, partition: &str, records: &[Record]) -> Result<usize, StoreError> {
        self.ensure_writable()?;
        let tree = self.tree(partition)?;
        let mut batch = sled::Batch::default();
        for record in records {
            batch.insert(record.id().as_str(), bincode::serialize(record)?);
        }
        tree.apply_batch(batch)?;
        debug!(partition, records = records.len(), "Batch applied");
        Ok(records.len())
    }

    fn list_partitions(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self
            .db
            .tree_names()
            .into_iter()
            .filter(|name| &name[..] != DEFAULT_TREE)
            .map(|name| String::from_utf8_lossy(&name).into_owned())
            .collect();
        names.sort();
        Ok(names)
    }

    fn drop_partition(&self, partition: &str) -> Result<bool, StoreError> {
        self.ensure_writable()?;
        if partition.as_bytes() == DEFAULT_TREE {
            return Err(StoreError::InvalidPartition(partition.to_string()));
        }
        let dropped = self.db.drop_tree(partition)?;
        if dropped {
            info!(partition, "Partition dropped");
        }
        Ok(dropped)
    }

    fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let flushed = self.db.flush()?;
        info!(bytes = flushed, "Document store flushed and closed");
        Ok(())
    }
}
