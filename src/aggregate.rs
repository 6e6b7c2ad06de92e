//! Result aggregation: final chain texts become identity-keyed [`Record`]s.
//!
//! Labels are extracted for every input up front. Titles and media are produced lazily, one
//! input at a time, as the returned stream is polled.

use crate::chain::retry::{with_retry, RetryPolicy};
use crate::error::ServiceError;
use crate::provider::{MediaService, MediaSize, Summarizer};
use crate::record::{Media, Record};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use futures::future::join_all;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Extracts classification labels from a text
#[async_trait]
pub trait LabelExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<BTreeSet<String>, ServiceError>;
}

const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "before", "being", "but", "by", "can", "could", "did", "do", "does", "for", "from", "had",
    "has", "have", "he", "her", "his", "how", "i", "if", "in", "into", "is", "it", "its", "may",
    "might", "more", "most", "my", "no", "not", "of", "on", "or", "our", "over", "she", "should",
    "so", "some", "than", "that", "the", "their", "them", "then", "there", "these", "they",
    "this", "those", "to", "under", "up", "was", "we", "were", "what", "when", "which", "while",
    "who", "will", "with", "would", "you", "your",
];

/// Keeps every alphabetic word that is not a stop word, lowercased.
#[derive(Debug, Default, Clone)]
pub struct StopwordLabelExtractor;

impl StopwordLabelExtractor {
    pub fn labels(text: &str) -> BTreeSet<String> {
        text.split_whitespace()
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|word| !word.is_empty() && word.chars().all(char::is_alphabetic))
            .map(str::to_lowercase)
            .filter(|word| !STOP_WORDS.contains(&word.as_str()))
            .collect()
    }
}

#[async_trait]
impl LabelExtractor for StopwordLabelExtractor {
    async fn extract(&self, text: &str) -> Result<BTreeSet<String>, ServiceError> {
        Ok(Self::labels(text))
    }
}

/// One final chain text plus the context it came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateInput {
    pub text: String,
    pub description: String,
    pub urls: Vec<String>,
}

impl AggregateInput {
    pub fn new(text: impl Into<String>, description: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            text: text.into(),
            description: description.into(),
            urls,
        }
    }
}

impl From<String> for AggregateInput {
    fn from(text: String) -> Self {
        Self {
            text,
            ..Self::default()
        }
    }
}

impl From<&str> for AggregateInput {
    fn from(text: &str) -> Self {
        Self::from(text.to_string())
    }
}

pub struct ResultAggregator {
    summarizer: Arc<dyn Summarizer>,
    media: Arc<dyn MediaService>,
    labels: Arc<dyn LabelExtractor>,
    retry: RetryPolicy,
    media_size: MediaSize,
    tags: BTreeSet<String>,
    date: Option<NaiveDate>,
}

impl ResultAggregator {
    pub fn new(
        summarizer: Arc<dyn Summarizer>,
        media: Arc<dyn MediaService>,
        labels: Arc<dyn LabelExtractor>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            summarizer,
            media,
            labels,
            retry,
            media_size: MediaSize::default(),
            tags: BTreeSet::new(),
            date: None,
        }
    }

    pub fn with_media_size(mut self, size: MediaSize) -> Self {
        self.media_size = size;
        self
    }

    /// Tags attached to every record produced.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Stamp records with `date` instead of the local date.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Turn texts into records. Empty texts are skipped; everything else yields a record.
    pub async fn aggregate<'a, I>(&'a self, inputs: I) -> BoxStream<'a, Record>
    where
        I: IntoIterator,
        I::Item: Into<AggregateInput>,
    {
        let inputs: Vec<AggregateInput> = inputs.into_iter().map(Into::into).collect();
        let labels = join_all(inputs.iter().map(|input| self.extract_labels(&input.text))).await;
        let date = self.date.unwrap_or_else(|| Local::now().date_naive());
        info!(inputs = inputs.len(), %date, "Aggregating results");

        stream::iter(inputs.into_iter().zip(labels))
            .filter_map(move |(input, labels)| self.build_record(input, labels, date))
            .boxed()
    }

    async fn extract_labels(&self, text: &str) -> BTreeSet<String> {
        match self.labels.extract(text).await {
            Ok(labels) => labels,
            Err(err) => {
                warn!(error = %err, "Label extraction failed, record gets no labels");
                BTreeSet::new()
            }
        }
    }

    async fn build_record(
        &self,
        input: AggregateInput,
        labels: BTreeSet<String>,
        date: NaiveDate,
    ) -> Option<Record> {
        if input.text.trim().is_empty() {
            debug!("Skipping empty result text");
            return None;
        }

        let title = self.title_for(&input.text).await;
        let media = self.media_for(&title).await;
        let record = Record::new(title, input.description, input.text, date)
            .with_media(media)
            .with_urls(input.urls)
            .with_labels(labels)
            .with_tags(self.tags.clone());
        debug!(id = %record.id(), title = record.title(), "Record generated");
        Some(record)
    }

    async fn title_for(&self, text: &str) -> String {
        let summarizer = &self.summarizer;
        match with_retry(&self.retry, "summarizer.summarize", move || summarizer.summarize(text))
            .await
        {
            Ok(title) => title,
            Err(err) => {
                warn!(error = %err, "Summary failed, record keeps an empty title");
                String::new()
            }
        }
    }

    async fn media_for(&self, title: &str) -> Option<Media> {
        if title.trim().is_empty() {
            return None;
        }
        let media = &self.media;
        let size = &self.media_size;
        match with_retry(&self.retry, "media.generate", move || media.generate(title, size)).await
        {
            Ok(media) => Some(media),
            Err(err) => {
                warn!(error = %err, "Media generation failed, record has no media");
                None
            }
        }
    }
}
