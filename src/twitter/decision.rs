use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::client::{Tweet, TwitterClient};
use super::render::render_tweet;
use crate::config::TwitterConfig;
use crate::discord::PreparedHook;
use crate::filter::keep;
use crate::hooks::{FeedKind, HookRepository, SocialHook, TwitterFeed};
use crate::scheduler::FeedHandler;
use crate::Result;

/// One post and the subscribers whose filters keep it.
#[derive(Debug, Clone)]
pub struct TwitterJob {
    pub tweet: Tweet,
    pub recipients: Vec<SocialHook>,
}

/// Keep the subscribers whose lists accept `text`.
pub fn recipients_for(subscribers: &[SocialHook], text: &str) -> Vec<SocialHook> {
    subscribers
        .iter()
        .filter(|h| keep(&h.whitelist, &h.blacklist, text))
        .cloned()
        .collect()
}

/// [`FeedHandler`] for timelines. Each tick looks back one polling period.
pub struct TwitterHandler {
    client: TwitterClient,
}

impl TwitterHandler {
    pub fn new(config: &TwitterConfig) -> Result<Self> {
        Ok(Self {
            client: TwitterClient::new(config)?,
        })
    }
}

#[async_trait]
impl FeedHandler for TwitterHandler {
    type Feed = TwitterFeed;
    type State = ();
    type Job = TwitterJob;

    fn kind(&self) -> FeedKind {
        FeedKind::Twitter
    }

    async fn decide(
        &self,
        feed: &TwitterFeed,
        _state: &mut (),
        tick: DateTime<Utc>,
        interval: Duration,
        repo: &dyn HookRepository,
    ) -> Result<Vec<TwitterJob>> {
        let window = chrono::Duration::from_std(interval).unwrap_or(chrono::Duration::zero());
        let tweets = self.client.latest_tweets(feed.twitter_id, tick - window).await?;
        if tweets.is_empty() {
            return Ok(Vec::new());
        }

        let subscribers = repo.social_subscribers(FeedKind::Twitter, feed.id).await?;
        if subscribers.is_empty() {
            return Ok(Vec::new());
        }
        debug!(
            "Timeline {}: {} post(s), {} subscriber(s)",
            feed.name,
            tweets.len(),
            subscribers.len()
        );

        Ok(tweets
            .into_iter()
            .filter_map(|tweet| {
                let recipients = recipients_for(&subscribers, &tweet.text);
                (!recipients.is_empty()).then_some(TwitterJob { tweet, recipients })
            })
            .collect())
    }

    fn render(&self, _feed: &TwitterFeed, job: &TwitterJob) -> Result<Vec<PreparedHook>> {
        render_tweet(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn hook(whitelist: &[&str], blacklist: &[&str]) -> SocialHook {
        SocialHook {
            id: Uuid::new_v4(),
            kind: FeedKind::Twitter,
            callback: "https://discord.test/hook".to_string(),
            format: "discord".to_string(),
            whitelist: whitelist.iter().map(|s| s.to_string()).collect(),
            blacklist: blacklist.iter().map(|s| s.to_string()).collect(),
            preview_length: 280,
            subscriptions: vec![1],
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_fired_at: None,
        }
    }

    #[test]
    fn test_recipients_for() {
        let subscribers = vec![
            hook(&[], &[]),
            hook(&["patch"], &[]),
            hook(&[], &["maintenance"]),
        ];

        assert_eq!(recipients_for(&subscribers, "New Patch notes").len(), 3);
        assert_eq!(recipients_for(&subscribers, "Maintenance tonight").len(), 1);
    }
}
