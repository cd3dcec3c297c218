//! Timeline API client.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::TwitterConfig;
use crate::scheduler::USER_AGENT;
use crate::{HookError, Result};

/// Request timeout for timeline lookups.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Author of a post.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TwitterUser {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub profile_image_url: String,
}

/// A top-level post with its resolved photo attachments.
#[derive(Debug, Clone, PartialEq)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub author: TwitterUser,
    /// Photo URLs in attachment order.
    pub attachments: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TimelineResponse {
    #[serde(default)]
    data: Vec<ApiTweet>,
    #[serde(default)]
    includes: Includes,
    #[serde(default)]
    meta: Meta,
}

#[derive(Debug, Deserialize)]
struct ApiTweet {
    #[serde(default)]
    id: String,
    text: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    in_reply_to_user_id: Option<String>,
    #[serde(default)]
    attachments: Attachments,
}

#[derive(Debug, Default, Deserialize)]
struct Attachments {
    #[serde(default)]
    media_keys: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<TwitterUser>,
    #[serde(default)]
    media: Vec<Media>,
}

#[derive(Debug, Deserialize)]
struct Media {
    media_key: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    #[serde(default)]
    result_count: u32,
}

/// HTTP client for user timelines.
#[derive(Debug, Clone)]
pub struct TwitterClient {
    client: Client,
    api_url: String,
    bearer_token: String,
    max_results: u32,
}

impl TwitterClient {
    pub fn new(config: &TwitterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HookError::Http(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
            max_results: config.max_results,
        })
    }

    /// Posts by `user_id` since `since`, replies excluded.
    pub async fn latest_tweets(&self, user_id: u64, since: DateTime<Utc>) -> Result<Vec<Tweet>> {
        if user_id == 0 {
            return Err(HookError::Validation("invalid user id".to_string()));
        }

        let url = format!("{}/2/users/{}/tweets", self.api_url, user_id);
        debug!("Fetching timeline of {} since {}", user_id, since);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .query(&[
                ("max_results", self.max_results.to_string()),
                (
                    "start_time",
                    since.to_rfc3339_opts(SecondsFormat::Secs, true),
                ),
                ("tweet.fields", "created_at,in_reply_to_user_id".to_string()),
                ("expansions", "author_id,attachments.media_keys".to_string()),
                ("user.fields", "name,username,profile_image_url".to_string()),
                ("media.fields", "url".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HookError::Upstream(format!(
                "timeline API returned {}",
                response.status()
            )));
        }

        let body: TimelineResponse = response
            .json()
            .await
            .map_err(|e| HookError::Parse(format!("invalid timeline response: {}", e)))?;

        Ok(collect_tweets(body))
    }
}

fn collect_tweets(body: TimelineResponse) -> Vec<Tweet> {
    let Some(author) = body.includes.users.first() else {
        return Vec::new();
    };
    if body.meta.result_count < 1 {
        return Vec::new();
    }

    body.data
        .into_iter()
        .filter(|t| t.in_reply_to_user_id.is_none())
        .map(|t| {
            let attachments = t
                .attachments
                .media_keys
                .iter()
                .flat_map(|key| {
                    body.includes
                        .media
                        .iter()
                        .filter(move |m| &m.media_key == key && m.kind == "photo")
                        .filter_map(|m| m.url.clone())
                })
                .collect();

            Tweet {
                id: t.id,
                text: t.text,
                created_at: t.created_at,
                author: author.clone(),
                attachments,
            }
        })
        .collect()
}
