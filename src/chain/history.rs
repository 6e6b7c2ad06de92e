//! Per-chain conversational history.

use serde::{Deserialize, Serialize};

/// Speaker of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    System,
}

/// One entry of a chain's transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub role: Role,
    pub content: String,
}

/// Append-only transcript of one chain.
///
/// Only whole exchanges are appended, so the length is always even and every user entry is
/// followed by the system response it produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    records: Vec<HistoryRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed exchange: the query, then the response.
    pub fn push_exchange(&mut self, query: impl Into<String>, response: impl Into<String>) {
        self.records.push(HistoryRecord {
            role: Role::User,
            content: query.into(),
        });
        self.records.push(HistoryRecord {
            role: Role::System,
            content: response.into(),
        });
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of completed exchanges
    pub fn exchanges(&self) -> usize {
        self.records.len() / 2
    }
}
