//! Fingerprint-based new-item detection.
//!
//! The poll state remembers the fingerprint of the newest item seen. Items
//! newer than that baseline are new. The first poll only records a baseline.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::fetcher::{FeedItem, RssFetcher};
use super::render::render_item;
use crate::config::RssConfig;
use crate::discord::PreparedHook;
use crate::filter::keep;
use crate::hooks::{FeedKind, HookRepository, RssFeed, SocialHook};
use crate::scheduler::FeedHandler;
use crate::{HookError, Result};

/// SHA-256 of an item's identifying fields.
pub type Fingerprint = [u8; 32];

/// Poll state of one content feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssState {
    /// Fingerprint of the newest item of the last poll.
    pub baseline: Option<Fingerprint>,
}

/// Items detected as new and the baseline to commit afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Indexes into the polled items, newest first.
    pub new: Vec<usize>,
    pub baseline: Option<Fingerprint>,
    /// The previous baseline was not found in this poll.
    pub baseline_missed: bool,
}

/// Fingerprint an item.
pub fn fingerprint(item: &FeedItem) -> Fingerprint {
    let mut hasher = Sha256::new();
    let published = item.published_at.map(|d| d.to_rfc3339()).unwrap_or_default();
    for part in [
        item.guid.as_str(),
        item.title.as_str(),
        item.link.as_deref().unwrap_or_default(),
        item.description.as_str(),
        published.as_str(),
    ] {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part.as_bytes());
    }
    hasher.finalize().into()
}

/// Find the items newer than `baseline`.
///
/// Without a baseline nothing is new. When the baseline is missing from the
/// poll at most `cap` items count as new.
pub fn detect_new(items: &[FeedItem], baseline: Option<Fingerprint>, cap: usize) -> Detection {
    let Some(first) = items.first() else {
        return Detection {
            new: Vec::new(),
            baseline,
            baseline_missed: false,
        };
    };
    let newest = Some(fingerprint(first));

    let Some(baseline) = baseline else {
        return Detection {
            new: Vec::new(),
            baseline: newest,
            baseline_missed: false,
        };
    };

    let mut new = Vec::new();
    let mut found = false;
    for (i, item) in items.iter().enumerate() {
        if fingerprint(item) == baseline {
            found = true;
            break;
        }
        new.push(i);
    }

    if !found {
        new.truncate(cap);
    }

    Detection {
        new,
        baseline: newest,
        baseline_missed: !found,
    }
}

/// One new item and the subscribers whose filters keep it.
#[derive(Debug, Clone)]
pub struct RssJob {
    pub item: FeedItem,
    pub recipients: Vec<SocialHook>,
}

/// [`FeedHandler`] for content feeds.
pub struct RssHandler {
    fetcher: RssFetcher,
    max_new_items: usize,
    avatar_url: String,
    image_re: Regex,
}

/// First `<img src>` in an HTML body.
const IMAGE_PATTERN: &str = r#"(?i)<img[^>]+src="([^">]+)""#;

impl RssHandler {
    pub fn new(config: &RssConfig) -> Result<Self> {
        Ok(Self {
            fetcher: RssFetcher::new(config)?,
            max_new_items: config.max_new_items_per_poll,
            avatar_url: config.avatar_url.clone(),
            image_re: Regex::new(IMAGE_PATTERN)
                .map_err(|e| HookError::Config(format!("invalid image pattern: {}", e)))?,
        })
    }
}

#[async_trait]
impl FeedHandler for RssHandler {
    type Feed = RssFeed;
    type State = RssState;
    type Job = RssJob;

    fn kind(&self) -> FeedKind {
        FeedKind::Rss
    }

    async fn decide(
        &self,
        feed: &RssFeed,
        state: &mut RssState,
        _tick: DateTime<Utc>,
        _interval: Duration,
        repo: &dyn HookRepository,
    ) -> Result<Vec<RssJob>> {
        let items = self.fetcher.fetch(&feed.url).await?;
        let detection = detect_new(&items, state.baseline, self.max_new_items);

        if detection.baseline_missed {
            warn!(
                "Feed {}: previous newest item not found, sending at most {} item(s)",
                feed.name,
                detection.new.len()
            );
        }

        if detection.new.is_empty() {
            state.baseline = detection.baseline;
            return Ok(Vec::new());
        }

        let subscribers = repo.social_subscribers(FeedKind::Rss, feed.id).await?;
        state.baseline = detection.baseline;
        debug!(
            "Feed {}: {} new item(s), {} subscriber(s)",
            feed.name,
            detection.new.len(),
            subscribers.len()
        );

        let jobs = detection
            .new
            .iter()
            .map(|&i| &items[i])
            .filter_map(|item| {
                let recipients: Vec<SocialHook> = subscribers
                    .iter()
                    .filter(|h| keep(&h.whitelist, &h.blacklist, &item.description))
                    .cloned()
                    .collect();
                (!recipients.is_empty()).then(|| RssJob {
                    item: item.clone(),
                    recipients,
                })
            })
            .collect();

        Ok(jobs)
    }

    fn render(&self, feed: &RssFeed, job: &RssJob) -> Result<Vec<PreparedHook>> {
        render_item(feed, job, &self.avatar_url, &self.image_re)
    }
}
