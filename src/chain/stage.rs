//! Stage: one unit of input fed to the generation service.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Fixed framing placed around every stage query.
///
/// The opening tells the model it is looking at one event of a sequence and that its earlier
/// predictions are in the history; the closing asks for the forecast itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptFraming {
    pub opening: String,
    pub closing: String,
}

impl PromptFraming {
    /// Framing that leaves queries untouched.
    pub fn none() -> Self {
        Self {
            opening: String::new(),
            closing: String::new(),
        }
    }

    /// Wrap a query. Blank queries stay blank so stage validation still rejects them.
    pub fn frame(&self, query: &str) -> String {
        if query.trim().is_empty() {
            return query.to_string();
        }
        format!("{}{}{}", self.opening, query, self.closing)
    }
}

impl Default for PromptFraming {
    fn default() -> Self {
        Self {
            opening: concat!(
                "You are trying to predict future outcomes of related events. ",
                "You are given only one event at a time but they are provided in sequence.\n",
                "Those events are called stages. A stage describes the current state of the world. ",
                "You may have produced one or more predictions already for other stages; ",
                "if so, build the next one on top of them.\n",
                "You will find all previous stages and their corresponding predictions in the history.\n",
                "The following statement is the content of the current stage.\n",
                "Query: ",
            )
            .to_string(),
            closing: concat!(
                "\nNow that you had a look at the query, predict what outcomes are the most likely. ",
                "Include details you find interesting to enrich your predictions. ",
                "Use a formal writing style, as if you are writing a financial news article. ",
                "Keep it literal and concise.\n",
            )
            .to_string(),
        }
    }
}

/// A unit of work within a chain. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    name: String,
    description: String,
    query: String,
    #[serde(default)]
    labels: BTreeSet<String>,
    #[serde(default)]
    tags: BTreeSet<String>,
    #[serde(default)]
    source_url: Option<String>,
}

impl Stage {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            query: query.into(),
            labels: BTreeSet::new(),
            tags: BTreeSet::new(),
            source_url: None,
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_source_url(mut self, url: Option<String>) -> Self {
        self.source_url = url;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    /// Check the stage can be sent to the generation service.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.query.trim().is_empty() {
            return Err(ValidationError::EmptyQuery(self.name.clone()));
        }
        Ok(())
    }
}
