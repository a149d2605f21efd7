//! Secondary "current literature" context from a web search API.

use crate::config::WebSearchSettings;
use crate::error::{QuizRagError, Result};
use crate::openai::create_http_client;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info, instrument};

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^<]+?>").expect("Invalid regex"));

/// Source of short, up-to-date reference text for a topic.
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    /// Context text for `topic`. Empty when nothing was found.
    async fn lookup(&self, topic: &str) -> Result<String>;
}

/// Literature source that never returns anything.
pub struct NoLiterature;

#[async_trait]
impl LiteratureSource for NoLiterature {
    async fn lookup(&self, _topic: &str) -> Result<String> {
        Ok(String::new())
    }
}

/// Serper-compatible web search.
pub struct WebSearch {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_results: usize,
    snippet_chars: usize,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<SearchItem>,
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: String,
}

impl WebSearch {
    pub fn new(settings: &WebSearchSettings, api_key: &str) -> Result<Self> {
        Ok(Self {
            http: create_http_client(Duration::from_secs(settings.timeout_seconds))?,
            endpoint: settings.endpoint.clone(),
            api_key: api_key.to_string(),
            max_results: settings.max_results,
            snippet_chars: settings.snippet_chars,
        })
    }

    fn format_items(&self, items: &[SearchItem]) -> String {
        items
            .iter()
            .filter(|item| !item.snippet.trim().is_empty())
            .take(self.max_results)
            .map(|item| {
                let snippet = limit_chars(&strip_html(&item.snippet), self.snippet_chars);
                if item.link.is_empty() {
                    snippet
                } else {
                    format!("{} ({})", snippet, item.link)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl LiteratureSource for WebSearch {
    #[instrument(skip(self))]
    async fn lookup(&self, topic: &str) -> Result<String> {
        let num = self.max_results.to_string();
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("q", topic), ("num", num.as_str())])
            .header("X-API-KEY", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QuizRagError::WebSearch(format!(
                "Search returned {}",
                response.status()
            )));
        }

        let body: SearchResponse = response.json().await?;
        let items = if body.organic.is_empty() { &body.items } else { &body.organic };
        let context = self.format_items(items);
        debug!("Web search produced {} characters for {}", context.len(), topic);
        Ok(context)
    }
}

/// Build the literature source: web search when enabled and keyed, otherwise none.
pub fn create_source(settings: &WebSearchSettings) -> Result<Arc<dyn LiteratureSource>> {
    match settings.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(key) if settings.enabled => Ok(Arc::new(WebSearch::new(settings, key)?)),
        _ => {
            info!("Web literature lookup disabled");
            Ok(Arc::new(NoLiterature))
        }
    }
}

/// Remove HTML tags and decode the common entities.
pub fn strip_html(text: &str) -> String {
    let without_tags = HTML_TAG.replace_all(text, "");
    decode_entities(&without_tags).trim().to_string()
}

fn decode_entities(text: &str) -> String {
    // &amp; last so "&amp;lt;" decodes to "&lt;" and not "<".
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Shorten to at most `max_chars` characters on a word boundary, marking the cut with `…`.
pub fn limit_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut out = String::new();
    let mut len = 0;
    for word in text.split_whitespace() {
        let extra = if out.is_empty() { 0 } else { 1 };
        let word_len = word.chars().count();
        // Leave room for the trailing ellipsis.
        if len + extra + word_len + 1 > max_chars {
            break;
        }
        if extra == 1 {
            out.push(' ');
        }
        out.push_str(word);
        len += extra + word_len;
    }

    if out.is_empty() {
        return "…".to_string();
    }
    out.push('…');
    out
}
