//! RSS/Atom feed fetcher with resource limits.

use std::time::Duration;

use chrono::{DateTime, Utc};
use feed_rs::parser;
use reqwest::Client;
use tracing::debug;

use crate::config::RssConfig;
use crate::{HookError, Result};

/// User agent string for feed fetching.
const USER_AGENT: &str = "ankama-discord-hooks (RSS Reader)";

/// One syndicated item, newest first in a parsed feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub guid: String,
    pub title: String,
    pub link: Option<String>,
    /// Raw HTML description.
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// Feed fetcher with timeouts, a redirect cap and a size cap.
pub struct RssFetcher {
    client: Client,
    max_feed_size: u64,
}

impl RssFetcher {
    pub fn new(config: &RssConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HookError::Http(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
        })
    }

    /// Fetch and parse a feed.
    pub async fn fetch(&self, url: &str) -> Result<Vec<FeedItem>> {
        debug!("Fetching feed {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HookError::Http(format!("failed to fetch feed: {}", e)))?;

        if !response.status().is_success() {
            return Err(HookError::Upstream(format!(
                "feed returned {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(HookError::Upstream(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    content_length, self.max_feed_size
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| HookError::Http(format!("failed to read response: {}", e)))?;

        if bytes.len() as u64 > self.max_feed_size {
            return Err(HookError::Upstream(format!(
                "feed too large: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_feed_size
            )));
        }

        parse_feed(&bytes)
    }
}

/// Parse feed bytes into items.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedItem>> {
    let feed =
        parser::parse(bytes).map_err(|e| HookError::Parse(format!("failed to parse feed: {}", e)))?;

    let items = feed
        .entries
        .into_iter()
        .map(|entry| FeedItem {
            guid: entry.id,
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            link: entry.links.first().map(|l| l.href.clone()),
            description: entry
                .summary
                .map(|t| t.content)
                .or(entry.content.and_then(|c| c.body))
                .unwrap_or_default(),
            published_at: entry.published.or(entry.updated),
        })
        .collect();

    Ok(items)
}

/// Strip HTML tags and decode entities.
pub fn strip_html(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut in_entity = false;
    let mut entity = String::new();

    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                result.push(' ');
            }
            '&' if !in_tag => {
                in_entity = true;
                entity.clear();
            }
            ';' if in_entity => {
                in_entity = false;
                match entity.as_str() {
                    "amp" => result.push('&'),
                    "lt" => result.push('<'),
                    "gt" => result.push('>'),
                    "quot" => result.push('"'),
                    "apos" => result.push('\''),
                    "nbsp" => result.push(' '),
                    _ if entity.starts_with('#') => {
                        if let Some(c) = parse_numeric_entity(&entity).and_then(char::from_u32) {
                            result.push(c);
                        }
                    }
                    _ => {
                        result.push('&');
                        result.push_str(&entity);
                        result.push(';');
                    }
                }
            }
            _ if in_entity => entity.push(ch),
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    result.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Parse a numeric HTML entity (e.g., "#123" or "#x7B").
fn parse_numeric_entity(entity: &str) -> Option<u32> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok()
    } else {
        entity.strip_prefix('#')?.parse().ok()
    }
}
