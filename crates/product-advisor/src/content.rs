//! Discussion content acquisition.
//!
//! Content comes from an ordered list of tiers (Reddit JSON search, Reddit RSS
//! search). Each tier is tried exactly once, in order; the first success wins and
//! exhaustion yields a fixed placeholder, so fetching never fails.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::SourceError;

pub const MAX_ENTRIES: usize = 8;
pub const MAX_BODY_CHARS: usize = 600;

const SEARCH_LIMIT: &str = "15";
const SEARCH_SORT: &str = "top";
const SEARCH_WINDOW: &str = "month";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

static RSS_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<title><!\[CDATA\[(.*?)\]\]></title>").expect("valid regex")
});
static RSS_DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<description><!\[CDATA\[(.*?)\]\]></description>").expect("valid regex")
});

/// One tier of the content cascade.
#[async_trait]
pub trait ContentSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, query: &str, language: &str) -> Result<String, SourceError>;
}

/// Placeholder used when every tier failed.
pub fn fallback_content(query: &str) -> String {
    format!(
        "Search query: \"{query}\"\n\nUnable to fetch Reddit data, but performing AI analysis based on product category."
    )
}

pub struct ContentCascade {
    tiers: Vec<Arc<dyn ContentSource>>,
}

impl ContentCascade {
    pub fn new(tiers: Vec<Arc<dyn ContentSource>>) -> Self {
        Self { tiers }
    }

    /// JSON search first, RSS search second.
    pub fn reddit(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self::new(vec![
            Arc::new(RedditJsonSource::new(http.clone(), base_url, timeout)),
            Arc::new(RedditRssSource::new(http, base_url, timeout)),
        ]))
    }

    pub async fn fetch_content(&self, query: &str, language: &str) -> String {
        for tier in &self.tiers {
            match tier.fetch(query, language).await {
                Ok(content) => {
                    info!(tier = tier.name(), chars = content.len(), "content tier succeeded");
                    return content;
                }
                Err(e) => {
                    warn!(tier = tier.name(), error = %e, "content tier failed, falling through");
                }
            }
        }
        warn!(query, "all content tiers failed, using fallback content");
        fallback_content(query)
    }
}

#[derive(Debug, Deserialize)]
struct RedditListing {
    data: RedditListingData,
}

#[derive(Debug, Deserialize)]
struct RedditListingData {
    #[serde(default)]
    children: Vec<RedditChild>,
}

#[derive(Debug, Deserialize)]
struct RedditChild {
    data: RedditPost,
}

#[derive(Debug, Default, Deserialize)]
struct RedditPost {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    selftext: Option<String>,
    #[serde(default)]
    score: Option<i64>,
    #[serde(default)]
    num_comments: Option<u64>,
    #[serde(default)]
    subreddit: Option<String>,
}

pub struct RedditJsonSource {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl RedditJsonSource {
    pub fn new(http: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            http,
            url: format!("{}/search.json", base_url.trim_end_matches('/')),
            timeout,
        }
    }
}

#[async_trait]
impl ContentSource for RedditJsonSource {
    fn name(&self) -> &'static str {
        "reddit-json"
    }

    async fn fetch(&self, query: &str, _language: &str) -> Result<String, SourceError> {
        let resp = self
            .http
            .get(&self.url)
            .query(&search_params(query))
            .header(reqwest::header::ACCEPT, "application/json, text/plain, */*")
            .timeout(self.timeout)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status()));
        }
        let bytes = resp.bytes().await?;
        let listing: RedditListing = serde_json::from_slice(&bytes)?;
        Ok(format_listing(query, listing))
    }
}

fn format_listing(query: &str, listing: RedditListing) -> String {
    let blocks: Vec<String> = listing
        .data
        .children
        .into_iter()
        .map(|child| child.data)
        .filter(|post| {
            post.selftext.as_deref().is_some_and(|s| !s.is_empty())
                || post.title.as_deref().is_some_and(|t| !t.is_empty())
        })
        .take(MAX_ENTRIES)
        .map(|post| {
            let subreddit = post
                .subreddit
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "Unknown".to_string());
            format!(
                "\nTitle: {}\nContent: {}\nScore: {}\nComments: {}\nSubreddit: {}\n---",
                post.title.unwrap_or_default(),
                truncate_chars(post.selftext.as_deref().unwrap_or_default(), MAX_BODY_CHARS),
                post.score.unwrap_or(0),
                post.num_comments.unwrap_or(0),
                subreddit,
            )
        })
        .collect();

    if blocks.is_empty() {
        return format!("No relevant Reddit discussions found for \"{query}\"");
    }
    blocks.join("\n")
}

pub struct RedditRssSource {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl RedditRssSource {
    pub fn new(http: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            http,
            url: format!("{}/search.rss", base_url.trim_end_matches('/')),
            timeout,
        }
    }
}

#[async_trait]
impl ContentSource for RedditRssSource {
    fn name(&self) -> &'static str {
        "reddit-rss"
    }

    async fn fetch(&self, query: &str, _language: &str) -> Result<String, SourceError> {
        let resp = self
            .http
            .get(&self.url)
            .query(&search_params(query))
            .header(
                reqwest::header::ACCEPT,
                "application/rss+xml, application/xml, text/xml",
            )
            .timeout(self.timeout)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status()));
        }
        let body = resp.text().await?;
        extract_feed_entries(&body).ok_or(SourceError::Empty)
    }
}

/// Marker-based scan of a search feed. The first title belongs to the feed itself
/// and is skipped. `None` when no entry could be extracted.
pub fn extract_feed_entries(feed: &str) -> Option<String> {
    let titles: Vec<&str> = RSS_TITLE_RE
        .captures_iter(feed)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    let descriptions: Vec<&str> = RSS_DESCRIPTION_RE
        .captures_iter(feed)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    let mut content = String::new();
    for (i, title) in titles.iter().enumerate().skip(1).take(MAX_ENTRIES) {
        if title.is_empty() {
            continue;
        }
        let description = descriptions.get(i).copied().unwrap_or_default();
        content.push_str(&format!(
            "\nTitle: {title}\nContent: {}\n---",
            truncate_chars(description, MAX_BODY_CHARS)
        ));
    }

    if content.is_empty() {
        None
    } else {
        Some(content)
    }
}

fn search_params(query: &str) -> [(&'static str, &str); 4] {
    [
        ("q", query),
        ("limit", SEARCH_LIMIT),
        ("sort", SEARCH_SORT),
        ("t", SEARCH_WINDOW),
    ]
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
