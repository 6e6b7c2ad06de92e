//! Content Source
//!
//! Where stages come from: an ordered list of articles per topic. The pipeline only depends
//! on [`ContentSource`]; [`NewsApiSource`] talks to newsapi.org.

use crate::error::ServiceError;
use crate::http::{build_http_client, check_status, map_http_error};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Which listing of the source to query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Current top headlines
    Headlines,
    /// Full archive search
    #[default]
    Everything,
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceMode::Headlines => f.write_str("headlines"),
            SourceMode::Everything => f.write_str("everything"),
        }
    }
}

/// One topic: a set of search terms matched with OR
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicQuery {
    terms: Vec<String>,
}

impl TopicQuery {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.iter().all(|term| term.trim().is_empty())
    }

    /// Search expression: multi-word terms are quoted as phrases.
    pub fn query_string(&self) -> String {
        self.terms
            .iter()
            .map(|term| term.trim())
            .filter(|term| !term.is_empty())
            .map(|term| {
                if term.contains(char::is_whitespace) {
                    format!("\"{}\"", term)
                } else {
                    term.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" OR ")
    }
}

impl fmt::Display for TopicQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.terms.join(", "))
    }
}

/// One article as delivered by the source, in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub title: String,
    pub description: String,
    pub body: String,
    pub url: Option<String>,
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch at most `page_limit` items for `topic`.
    async fn fetch(
        &self,
        topic: &TopicQuery,
        mode: SourceMode,
        page_limit: usize,
    ) -> Result<Vec<ContentItem>, ServiceError>;

    /// Release connections held by the source.
    async fn close(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    total_results: u64,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Deserialize)]
struct NewsApiArticle {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
}

impl From<NewsApiArticle> for ContentItem {
    fn from(article: NewsApiArticle) -> Self {
        ContentItem {
            title: article.title.unwrap_or_default(),
            description: article.description.unwrap_or_default(),
            body: article.content.unwrap_or_default(),
            url: article.url,
        }
    }
}

/// newsapi.org client
pub struct NewsApiSource {
    client: Client,
    api_key: String,
    base_url: String,
    language: String,
    closed: AtomicBool,
}

impl NewsApiSource {
    pub const DEFAULT_BASE_URL: &'static str = "https://newsapi.org/v2";
    /// Largest page the API serves
    pub const MAX_PAGE_SIZE: usize = 100;

    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        language: impl Into<String>,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_http_client(ServiceError::SourceUnavailable)?,
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
            language: language.into(),
            closed: AtomicBool::new(false),
        })
    }

    fn endpoint(&self, mode: SourceMode) -> String {
        match mode {
            SourceMode::Headlines => format!("{}/top-headlines", self.base_url),
            SourceMode::Everything => format!("{}/everything", self.base_url),
        }
    }

    fn query_params(
        &self,
        topic: &TopicQuery,
        mode: SourceMode,
        page_limit: usize,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", topic.query_string()),
            (
                "pageSize",
                page_limit.clamp(1, Self::MAX_PAGE_SIZE).to_string(),
            ),
        ];
        if !self.language.is_empty() {
            params.push(("language", self.language.clone()));
        }
        if mode == SourceMode::Everything {
            params.push(("sortBy", "relevancy".to_string()));
        }
        params
    }
}

fn parse_response(response: NewsApiResponse) -> Result<Vec<ContentItem>, ServiceError> {
    if response.status != "ok" {
        return Err(ServiceError::SourceUnavailable(
            response
                .message
                .unwrap_or_else(|| format!("status '{}'", response.status)),
        ));
    }
    debug!(
        total_results = response.total_results,
        returned = response.articles.len(),
        "News response parsed"
    );
    Ok(response.articles.into_iter().map(ContentItem::from).collect())
}

#[async_trait]
impl ContentSource for NewsApiSource {
    async fn fetch(
        &self,
        topic: &TopicQuery,
        mode: SourceMode,
        page_limit: usize,
    ) -> Result<Vec<ContentItem>, ServiceError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ServiceError::SourceUnavailable(
                "news source is closed".to_string(),
            ));
        }

        let url = self.endpoint(mode);
        info!(topic = %topic, mode = %mode, page_limit, "Requesting articles");
        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .query(&self.query_params(topic, mode, page_limit))
            .send()
            .await
            .map_err(|e| map_http_error(e, ServiceError::SourceUnavailable))?;
        let response = check_status(response, ServiceError::SourceUnavailable).await?;

        let body: NewsApiResponse = response.json().await.map_err(|e| {
            ServiceError::SourceUnavailable(format!("Failed to parse response: {}", e))
        })?;
        parse_response(body)
    }

    async fn close(&self) -> Result<(), ServiceError> {
        self.closed.store(true, Ordering::Release);
        info!("News source closed");
        Ok(())
    }
}
