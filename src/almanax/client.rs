//! Almanax calendar API client.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::AlmanaxConfig;
use crate::datetime::ISO_DATE_FORMAT;
use crate::scheduler::USER_AGENT;
use crate::{HookError, Result};

/// Request timeout for calendar lookups.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// One calendar day.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlmanaxEntry {
    pub date: NaiveDate,
    #[serde(default)]
    pub reward_kamas: i64,
    pub bonus: Bonus,
    pub tribute: Tribute,
}

/// Bonus of the day.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Bonus {
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: BonusType,
}

/// Bonus category.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BonusType {
    pub id: String,
    pub name: String,
}

/// Offering required for the day.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tribute {
    pub quantity: u32,
    pub item: TributeItem,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TributeItem {
    pub name: String,
    #[serde(default)]
    pub image_urls: ImageUrls,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImageUrls {
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub sd: Option<String>,
}

impl TributeItem {
    /// Highest resolution image available.
    pub fn best_image(&self) -> &str {
        self.image_urls
            .sd
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.image_urls.icon)
    }
}

/// Calendar days keyed by date.
pub type AlmanaxCalendar = BTreeMap<NaiveDate, AlmanaxEntry>;

#[derive(Debug, Deserialize)]
struct BonusMeta {
    id: String,
}

/// HTTP client for the calendar API.
#[derive(Debug, Clone)]
pub struct AlmanaxClient {
    client: Client,
    api_url: String,
    game: String,
}

impl AlmanaxClient {
    pub fn new(config: &AlmanaxConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HookError::Http(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            game: config.game.clone(),
        })
    }

    /// Fetch `size` days starting at `from`.
    pub async fn fetch_range(
        &self,
        language: &str,
        from: NaiveDate,
        size: u32,
        timezone: &str,
    ) -> Result<AlmanaxCalendar> {
        let url = format!("{}/{}/v1/{}/almanax", self.api_url, self.game, language);
        debug!("Fetching almanax {} from {} ({} days)", language, from, size);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("range[from]", from.format(ISO_DATE_FORMAT).to_string()),
                ("range[size]", size.to_string()),
                ("timezone", timezone.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HookError::Upstream(format!(
                "almanax API returned {}",
                response.status()
            )));
        }

        let entries: Vec<AlmanaxEntry> = response
            .json()
            .await
            .map_err(|e| HookError::Parse(format!("invalid almanax response: {}", e)))?;

        Ok(entries.into_iter().map(|e| (e.date, e)).collect())
    }

    /// All known bonus type ids.
    pub async fn bonus_ids(&self, language: &str) -> Result<BTreeSet<String>> {
        let url = format!(
            "{}/{}/v1/meta/{}/almanax/bonuses",
            self.api_url, self.game, language
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(HookError::Upstream(format!(
                "almanax bonus API returned {}",
                response.status()
            )));
        }

        let bonuses: Vec<BonusMeta> = response
            .json()
            .await
            .map_err(|e| HookError::Parse(format!("invalid bonus response: {}", e)))?;
        Ok(bonuses.into_iter().map(|b| b.id).collect())
    }
}
