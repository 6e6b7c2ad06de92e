//! Output records and the identity-keyed set they are collected into.
//!
//! A [`Record`] is equal to another record only when both carry the same [`RecordId`].
//! Two forecasts with identical text are still two records; the set only guards against the
//! same record being submitted twice.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::{self, Entry};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

const ID_SUFFIX_BYTES: usize = 3;

/// Globally unique record identity: a random UUID plus a short random hex suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4();
        RecordId(format!(
            "{}-{}",
            Uuid::new_v4().simple(),
            hex::encode(&suffix.as_bytes()[..ID_SUFFIX_BYTES])
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generated illustration attached to a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Media {
    /// Raw image bytes
    Bytes(Vec<u8>),
    /// Remote reference, kept when the bytes could not be fetched
    Url(String),
}

/// A finished forecast, ready for persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    title: String,
    description: String,
    content: String,
    date: NaiveDate,
    media: Option<Media>,
    urls: Vec<String>,
    labels: BTreeSet<String>,
    tags: BTreeSet<String>,
}

impl Record {
    /// New record with a freshly generated identity.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        content: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: RecordId::generate(),
            title: title.into(),
            description: description.into(),
            content: content.into(),
            date,
            media: None,
            urls: Vec::new(),
            labels: BTreeSet::new(),
            tags: BTreeSet::new(),
        }
    }

    pub fn with_media(mut self, media: Option<Media>) -> Self {
        self.media = media;
        self
    }

    pub fn with_urls(mut self, urls: Vec<String>) -> Self {
        self.urls = urls;
        self
    }

    pub fn with_labels(mut self, labels: BTreeSet<String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_tags(mut self, tags: BTreeSet<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn media(&self) -> Option<&Media> {
        self.media.as_ref()
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Records produced by one run, deduplicated by identity
#[derive(Debug, Default)]
pub struct RecordSet {
    records: HashMap<RecordId, Record>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. Returns false when a record with the same id is already present.
    pub fn insert(&mut self, record: Record) -> bool {
        match self.records.entry(record.id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> hash_map::Values<'_, RecordId, Record> {
        self.records.values()
    }

    /// Records ordered by id, so repeated calls see the same order.
    pub fn into_sorted_vec(self) -> Vec<Record> {
        let mut records: Vec<Record> = self.records.into_values().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }
}

impl Extend<Record> for RecordSet {
    fn extend<T: IntoIterator<Item = Record>>(&mut self, iter: T) {
        for record in iter {
            self.insert(record);
        }
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}
