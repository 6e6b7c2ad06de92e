//! Scripted capability doubles.
//!
//! In-memory implementations of every capability trait, used by the unit and integration
//! tests. Each double records the calls it receives and can be told to fail for specific
//! inputs.

use crate::chain::history::HistoryRecord;
use crate::error::{ServiceError, StoreError};
use crate::provider::{GenerationService, MediaService, MediaSize, Summarizer};
use crate::record::{Media, Record};
use crate::source::{ContentItem, ContentSource, SourceMode, TopicQuery};
use crate::store::DocumentStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Article with predictable description, body and url derived from its title.
pub fn article(title: &str) -> ContentItem {
    ContentItem {
        title: title.to_string(),
        description: format!("description of {}", title),
        body: format!("body of {}", title),
        url: Some(format!("https://news.example/{}", title.replace(' ', "-"))),
    }
}

/// One observed call to [`ScriptedGeneration::complete`]
#[derive(Debug, Clone)]
pub struct GenerationCall {
    pub prompt: String,
    pub history: Vec<HistoryRecord>,
}

/// Generation double answering `forecast: {prompt}` unless scripted otherwise.
#[derive(Default)]
pub struct ScriptedGeneration {
    responses: HashMap<String, String>,
    // None fails forever, Some(n) fails the next n calls
    failures: Mutex<HashMap<String, Option<u32>>>,
    delays: HashMap<String, Duration>,
    panics: HashSet<String>,
    calls: Mutex<Vec<GenerationCall>>,
}

impl ScriptedGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, prompt: &str, response: &str) -> Self {
        self.responses
            .insert(prompt.to_string(), response.to_string());
        self
    }

    pub fn fail_always(self, prompt: &str) -> Self {
        self.failures.lock().insert(prompt.to_string(), None);
        self
    }

    pub fn fail_times(self, prompt: &str, times: u32) -> Self {
        self.failures.lock().insert(prompt.to_string(), Some(times));
        self
    }

    /// Sleep before answering `prompt`.
    pub fn delay(mut self, prompt: &str, delay: Duration) -> Self {
        self.delays.insert(prompt.to_string(), delay);
        self
    }

    pub fn panic_on(mut self, prompt: &str) -> Self {
        self.panics.insert(prompt.to_string());
        self
    }

    pub fn calls(&self) -> Vec<GenerationCall> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, prompt: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.prompt == prompt)
            .count()
    }

    fn should_fail(&self, prompt: &str) -> bool {
        let mut failures = self.failures.lock();
        match failures.get_mut(prompt) {
            Some(None) => true,
            Some(Some(0)) | None => false,
            Some(Some(remaining)) => {
                *remaining -= 1;
                true
            }
        }
    }
}

#[async_trait]
impl GenerationService for ScriptedGeneration {
    async fn complete(
        &self,
        history: &[HistoryRecord],
        prompt: &str,
    ) -> Result<String, ServiceError> {
        self.calls.lock().push(GenerationCall {
            prompt: prompt.to_string(),
            history: history.to_vec(),
        });

        if let Some(delay) = self.delays.get(prompt) {
            tokio::time::sleep(*delay).await;
        }
        if self.panics.contains(prompt) {
            panic!("scripted panic for '{}'", prompt);
        }
        if self.should_fail(prompt) {
            return Err(ServiceError::GenerationFailed(format!(
                "scripted failure for '{}'",
                prompt
            )));
        }

        Ok(self
            .responses
            .get(prompt)
            .cloned()
            .unwrap_or_else(|| format!("forecast: {}", prompt)))
    }
}

/// Content source double keyed by the topic's display form (`a, b` for terms a and b).
#[derive(Default)]
pub struct ScriptedSource {
    items: HashMap<String, Vec<ContentItem>>,
    failing: HashSet<String>,
    fail_close: bool,
    fetches: Mutex<Vec<(String, SourceMode)>>,
    closes: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(mut self, topic: &str, items: Vec<ContentItem>) -> Self {
        self.items.insert(topic.to_string(), items);
        self
    }

    pub fn failing(mut self, topic: &str) -> Self {
        self.failing.insert(topic.to_string());
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn fetches_for(&self, topic: &str) -> usize {
        self.fetches
            .lock()
            .iter()
            .filter(|(key, _)| key == topic)
            .count()
    }

    pub fn modes(&self) -> Vec<SourceMode> {
        self.fetches.lock().iter().map(|(_, mode)| *mode).collect()
    }

    pub fn close_calls(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for ScriptedSource {
    async fn fetch(
        &self,
        topic: &TopicQuery,
        mode: SourceMode,
        page_limit: usize,
    ) -> Result<Vec<ContentItem>, ServiceError> {
        let key = topic.to_string();
        self.fetches.lock().push((key.clone(), mode));

        if self.failing.contains(&key) {
            return Err(ServiceError::SourceUnavailable(format!(
                "scripted outage for '{}'",
                key
            )));
        }
        let mut items = self.items.get(&key).cloned().unwrap_or_default();
        items.truncate(page_limit);
        Ok(items)
    }

    async fn close(&self) -> Result<(), ServiceError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(ServiceError::SourceUnavailable(
                "scripted close failure".to_string(),
            ));
        }
        Ok(())
    }
}

/// Media double returning the prompt bytes as the image.
#[derive(Default)]
pub struct ScriptedMedia {
    fail: bool,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl MediaService for ScriptedMedia {
    async fn generate(&self, prompt: &str, _size: &MediaSize) -> Result<Media, ServiceError> {
        self.prompts.lock().push(prompt.to_string());
        if self.fail {
            return Err(ServiceError::MediaGenerationFailed(
                "scripted media failure".to_string(),
            ));
        }
        Ok(Media::Bytes(prompt.as_bytes().to_vec()))
    }
}

/// Summarizer double: the title is the first four words of the text.
#[derive(Default)]
pub struct ScriptedSummarizer {
    fail: bool,
    texts: Mutex<Vec<String>>,
}

impl ScriptedSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().clone()
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, ServiceError> {
        self.texts.lock().push(text.to_string());
        if self.fail {
            return Err(ServiceError::GenerationFailed(
                "scripted summary failure".to_string(),
            ));
        }
        Ok(text.split_whitespace().take(4).collect::<Vec<_>>().join(" "))
    }
}

/// In-memory document store.
#[derive(Default)]
pub struct MemoryStore {
    partitions: Mutex<BTreeMap<String, Vec<Record>>>,
    fail_insert: bool,
    fail_close: bool,
    closes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_inserts(mut self) -> Self {
        self.fail_insert = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn with_partition(self, name: &str, records: Vec<Record>) -> Self {
        self.partitions.lock().insert(name.to_string(), records);
        self
    }

    pub fn records(&self, partition: &str) -> Vec<Record> {
        self.partitions
            .lock()
            .get(partition)
            .cloned()
            .unwrap_or_default()
    }

    pub fn total_records(&self) -> usize {
        self.partitions.lock().values().map(Vec::len).sum()
    }

    pub fn close_calls(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl DocumentStore for MemoryStore {
    fn bulk_insert(&self, partition: &str, records: &[Record]) -> Result<usize, StoreError> {
        if self.fail_insert {
            return Err(StoreError::StoreUnavailable(
                "scripted insert failure".to_string(),
            ));
        }
        self.partitions
            .lock()
            .entry(partition.to_string())
            .or_default()
            .extend(records.iter().cloned());
        Ok(records.len())
    }

    fn list_partitions(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.partitions.lock().keys().cloned().collect())
    }

    fn drop_partition(&self, partition: &str) -> Result<bool, StoreError> {
        Ok(self.partitions.lock().remove(partition).is_some())
    }

    fn close(&self) -> Result<(), StoreError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(StoreError::StoreUnavailable(
                "scripted close failure".to_string(),
            ));
        }
        Ok(())
    }
}
