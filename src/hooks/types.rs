//! Feed and webhook types.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::datetime::parse_timezone;
use crate::filter::BonusFilter;
use crate::{HookError, Result};

/// The only supported rendering format.
pub const DEFAULT_FORMAT: &str = "discord";

/// Maximum number of mentions per Almanax webhook.
pub const MAX_MENTIONS: usize = 150;

/// Upper bound for a mention's days-before value.
pub const MAX_PING_DAYS_BEFORE: u32 = 31;

/// Default rendered length of a tweet.
pub const DEFAULT_TWITTER_PREVIEW_LENGTH: usize = 280;

/// Default rendered length of an RSS description.
pub const DEFAULT_RSS_PREVIEW_LENGTH: usize = 2000;

/// Lower-case English weekday names accepted for weekly delivery.
pub const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Kind of feed a webhook subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    Almanax,
    Rss,
    Twitter,
}

impl FeedKind {
    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Almanax => "almanax",
            FeedKind::Rss => "rss",
            FeedKind::Twitter => "twitter",
        }
    }

    /// Parse the stored representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "almanax" => Some(FeedKind::Almanax),
            "rss" => Some(FeedKind::Rss),
            "twitter" => Some(FeedKind::Twitter),
            _ => None,
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common view over the three feed variants.
pub trait Feed: Clone + Send + Sync + 'static {
    /// Feed id, unique across kinds.
    fn id(&self) -> i64;
    /// Human readable id, e.g. "almanax_fr" or "dofus2-fr-news".
    fn name(&self) -> &str;
    /// Feed kind.
    fn kind(&self) -> FeedKind;
}

/// An Almanax calendar feed for one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlmanaxFeed {
    pub id: i64,
    pub name: String,
    pub language: String,
}

impl Feed for AlmanaxFeed {
    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn kind(&self) -> FeedKind {
        FeedKind::Almanax
    }
}

/// An RSS/Atom feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RssFeed {
    pub id: i64,
    pub name: String,
    pub url: String,
}

impl Feed for RssFeed {
    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn kind(&self) -> FeedKind {
        FeedKind::Rss
    }
}

/// A Twitter account timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwitterFeed {
    pub id: i64,
    pub name: String,
    pub twitter_id: u64,
}

impl Feed for TwitterFeed {
    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn kind(&self) -> FeedKind {
        FeedKind::Twitter
    }
}

/// Delivery interval of an Almanax webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Interval {
    Daily,
    Weekly,
    Monthly,
}

impl Interval {
    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Daily => "daily",
            Interval::Weekly => "weekly",
            Interval::Monthly => "monthly",
        }
    }

    /// Parse the stored representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Interval::Daily),
            "weekly" => Some(Interval::Weekly),
            "monthly" => Some(Interval::Monthly),
            _ => None,
        }
    }
}

/// A Discord user or role to ping for a bonus type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub discord_id: u64,
    pub is_role: bool,
    /// Also ping this many days before the bonus comes up.
    pub ping_days_before: Option<u32>,
}

impl Mention {
    /// Create a user mention.
    pub fn user(discord_id: u64) -> Self {
        Self {
            discord_id,
            is_role: false,
            ping_days_before: None,
        }
    }

    /// Create a role mention.
    pub fn role(discord_id: u64) -> Self {
        Self {
            discord_id,
            is_role: true,
            ping_days_before: None,
        }
    }

    /// Set the days-before preview.
    pub fn with_days_before(mut self, days: u32) -> Self {
        self.ping_days_before = Some(days);
        self
    }

    /// Discord mention markup.
    pub fn tag(&self) -> String {
        if self.is_role {
            format!("<@&{}>", self.discord_id)
        } else {
            format!("<@{}>", self.discord_id)
        }
    }
}

/// Mentions keyed by bonus type id.
pub type Mentions = BTreeMap<String, Vec<Mention>>;

/// A registered Almanax webhook with its settings.
#[derive(Debug, Clone)]
pub struct AlmanaxHook {
    pub id: Uuid,
    pub callback: String,
    pub format: String,
    /// IANA timezone the subscriber lives in.
    pub timezone: String,
    /// Local hour (0-23) at which the webhook fires.
    pub midnight_offset: u32,
    pub intervals: Vec<Interval>,
    /// Lower-case English weekday for weekly delivery.
    pub weekly_weekday: Option<String>,
    pub bonus_filter: BonusFilter,
    pub mentions: Mentions,
    /// Render dates as `YYYY-MM-DD` instead of a localized format.
    pub wants_iso_date: bool,
    pub subscriptions: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_fired_at: Option<DateTime<Utc>>,
}

impl AlmanaxHook {
    /// Whether the interval is enabled.
    pub fn has_interval(&self, interval: Interval) -> bool {
        self.intervals.contains(&interval)
    }
}

/// A registered RSS or Twitter webhook with its settings.
#[derive(Debug, Clone)]
pub struct SocialHook {
    pub id: Uuid,
    pub kind: FeedKind,
    pub callback: String,
    pub format: String,
    pub whitelist: Vec<String>,
    pub blacklist: Vec<String>,
    /// Maximum rendered body length.
    pub preview_length: usize,
    pub subscriptions: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_fired_at: Option<DateTime<Utc>>,
}

/// New Almanax webhook for registration.
#[derive(Debug, Clone)]
pub struct NewAlmanaxHook {
    pub callback: String,
    pub subscriptions: Vec<i64>,
    pub timezone: String,
    pub midnight_offset: u32,
    pub intervals: Vec<Interval>,
    pub weekly_weekday: Option<String>,
    pub bonus_filter: BonusFilter,
    pub mentions: Mentions,
    pub wants_iso_date: bool,
}

impl NewAlmanaxHook {
    /// Create a daily webhook firing at local midnight in Europe/Paris.
    pub fn new(callback: impl Into<String>, subscriptions: Vec<i64>) -> Self {
        Self {
            callback: callback.into(),
            subscriptions,
            timezone: "Europe/Paris".to_string(),
            midnight_offset: 0,
            intervals: vec![Interval::Daily],
            weekly_weekday: None,
            bonus_filter: BonusFilter::Any,
            mentions: Mentions::new(),
            wants_iso_date: false,
        }
    }

    /// Set the timezone.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Set the local firing hour.
    pub fn with_midnight_offset(mut self, offset: u32) -> Self {
        self.midnight_offset = offset;
        self
    }

    /// Set the enabled intervals.
    pub fn with_intervals(mut self, intervals: Vec<Interval>) -> Self {
        self.intervals = intervals;
        self
    }

    /// Set the weekday for weekly delivery.
    pub fn with_weekly_weekday(mut self, weekday: impl Into<String>) -> Self {
        self.weekly_weekday = Some(weekday.into().to_lowercase());
        self
    }

    /// Set the bonus filter.
    pub fn with_bonus_filter(mut self, filter: BonusFilter) -> Self {
        self.bonus_filter = filter;
        self
    }

    /// Add a mention for a bonus type.
    pub fn with_mention(mut self, bonus_id: impl Into<String>, mention: Mention) -> Self {
        self.mentions.entry(bonus_id.into()).or_default().push(mention);
        self
    }

    /// Render ISO dates.
    pub fn with_iso_date(mut self, iso: bool) -> Self {
        self.wants_iso_date = iso;
        self
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<()> {
        validate_callback(&self.callback)?;
        validate_subscriptions(&self.subscriptions)?;
        parse_timezone(&self.timezone)?;

        if self.midnight_offset > 23 {
            return Err(HookError::Validation(format!(
                "midnight offset must be between 0 and 23, got {}",
                self.midnight_offset
            )));
        }
        if self.intervals.is_empty() {
            return Err(HookError::Validation(
                "at least one interval is required".to_string(),
            ));
        }
        if self.intervals.contains(&Interval::Weekly) {
            match self.weekly_weekday.as_deref() {
                Some(day) if WEEKDAYS.contains(&day) => {}
                Some(day) => {
                    return Err(HookError::Validation(format!("unknown weekday: {day}")))
                }
                None => {
                    return Err(HookError::Validation(
                        "weekly interval requires a weekday".to_string(),
                    ))
                }
            }
        }

        let mention_count: usize = self.mentions.values().map(Vec::len).sum();
        if mention_count > MAX_MENTIONS {
            return Err(HookError::Validation(format!(
                "at most {MAX_MENTIONS} mentions allowed, got {mention_count}"
            )));
        }
        for mention in self.mentions.values().flatten() {
            if let Some(days) = mention.ping_days_before {
                if !(1..=MAX_PING_DAYS_BEFORE).contains(&days) {
                    return Err(HookError::Validation(format!(
                        "ping_days_before must be between 1 and {MAX_PING_DAYS_BEFORE}, got {days}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// New RSS or Twitter webhook for registration.
#[derive(Debug, Clone)]
pub struct NewSocialHook {
    pub kind: FeedKind,
    pub callback: String,
    pub subscriptions: Vec<i64>,
    pub whitelist: Vec<String>,
    pub blacklist: Vec<String>,
    pub preview_length: Option<usize>,
}

impl NewSocialHook {
    /// Create a webhook without filters.
    pub fn new(kind: FeedKind, callback: impl Into<String>, subscriptions: Vec<i64>) -> Self {
        Self {
            kind,
            callback: callback.into(),
            subscriptions,
            whitelist: Vec::new(),
            blacklist: Vec::new(),
            preview_length: None,
        }
    }

    /// Set the allow-list. Terms are stored lower-cased.
    pub fn with_whitelist(mut self, words: Vec<String>) -> Self {
        self.whitelist = words.into_iter().map(|w| w.to_lowercase()).collect();
        self
    }

    /// Set the deny-list. Terms are stored lower-cased.
    pub fn with_blacklist(mut self, words: Vec<String>) -> Self {
        self.blacklist = words.into_iter().map(|w| w.to_lowercase()).collect();
        self
    }

    /// Set the maximum rendered length.
    pub fn with_preview_length(mut self, length: usize) -> Self {
        self.preview_length = Some(length);
        self
    }

    /// Preview length, falling back to the per-kind default.
    pub fn effective_preview_length(&self) -> usize {
        self.preview_length.unwrap_or(match self.kind {
            FeedKind::Twitter => DEFAULT_TWITTER_PREVIEW_LENGTH,
            _ => DEFAULT_RSS_PREVIEW_LENGTH,
        })
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<()> {
        if self.kind == FeedKind::Almanax {
            return Err(HookError::Validation(
                "almanax webhooks use NewAlmanaxHook".to_string(),
            ));
        }
        validate_callback(&self.callback)?;
        validate_subscriptions(&self.subscriptions)?;
        if self.preview_length == Some(0) {
            return Err(HookError::Validation(
                "preview length must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_callback(callback: &str) -> Result<()> {
    let parsed = url::Url::parse(callback)
        .map_err(|e| HookError::Validation(format!("invalid callback URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(HookError::Validation(format!(
            "unsupported callback scheme: {scheme}"
        ))),
    }
}

fn validate_subscriptions(subscriptions: &[i64]) -> Result<()> {
    if subscriptions.is_empty() {
        return Err(HookError::Validation(
            "at least one subscription is required".to_string(),
        ));
    }
    Ok(())
}

/// Weekday display names keyed by language then English weekday name.
#[derive(Debug, Clone, Default)]
pub struct WeekdayTranslations {
    entries: HashMap<String, HashMap<String, String>>,
}

impl WeekdayTranslations {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one translation.
    pub fn insert(
        &mut self,
        language: impl Into<String>,
        weekday: impl Into<String>,
        translation: impl Into<String>,
    ) {
        self.entries
            .entry(language.into())
            .or_default()
            .insert(weekday.into(), translation.into());
    }

    /// Look up a translation, e.g. `get("de", "Saturday") == Some("Samstag")`.
    pub fn get(&self, language: &str, weekday: &str) -> Option<&str> {
        self.entries
            .get(language)
            .and_then(|days| days.get(weekday))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALLBACK: &str = "https://discord.com/api/webhooks/1/abc";

    #[test]
    fn test_feed_kind_round_trip() {
        for kind in [FeedKind::Almanax, FeedKind::Rss, FeedKind::Twitter] {
            assert_eq!(FeedKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(FeedKind::parse("mastodon"), None);
    }

    #[test]
    fn test_interval_parse() {
        assert_eq!(Interval::parse("weekly"), Some(Interval::Weekly));
        assert_eq!(Interval::parse("hourly"), None);
    }

    #[test]
    fn test_mention_tag() {
        assert_eq!(Mention::user(42).tag(), "<@42>");
        assert_eq!(Mention::role(7).tag(), "<@&7>");
    }

    #[test]
    fn test_new_almanax_hook_defaults_validate() {
        let hook = NewAlmanaxHook::new(CALLBACK, vec![1]);
        assert_eq!(hook.intervals, vec![Interval::Daily]);
        assert!(hook.validate().is_ok());
    }

    #[test]
    fn test_new_almanax_hook_rejects_bad_offset() {
        let hook = NewAlmanaxHook::new(CALLBACK, vec![1]).with_midnight_offset(24);
        assert!(matches!(hook.validate(), Err(HookError::Validation(_))));
    }

    #[test]
    fn test_new_almanax_hook_weekly_requires_weekday() {
        let hook = NewAlmanaxHook::new(CALLBACK, vec![1]).with_intervals(vec![Interval::Weekly]);
        assert!(hook.validate().is_err());

        let hook = hook.with_weekly_weekday("Monday");
        assert_eq!(hook.weekly_weekday.as_deref(), Some("monday"));
        assert!(hook.validate().is_ok());

        let hook = hook.with_weekly_weekday("someday");
        assert!(hook.validate().is_err());
    }

    #[test]
    fn test_new_almanax_hook_rejects_bad_timezone() {
        let hook = NewAlmanaxHook::new(CALLBACK, vec![1]).with_timezone("Moon/Base");
        assert!(matches!(hook.validate(), Err(HookError::Timezone(_))));
    }

    #[test]
    fn test_new_almanax_hook_mention_bounds() {
        let hook = NewAlmanaxHook::new(CALLBACK, vec![1])
            .with_mention("kamas", Mention::user(1).with_days_before(0));
        assert!(hook.validate().is_err());

        let hook = NewAlmanaxHook::new(CALLBACK, vec![1])
            .with_mention("kamas", Mention::user(1).with_days_before(31));
        assert!(hook.validate().is_ok());

        let mut hook = NewAlmanaxHook::new(CALLBACK, vec![1]);
        for i in 0..=MAX_MENTIONS as u64 {
            hook = hook.with_mention("kamas", Mention::user(i));
        }
        assert!(hook.validate().is_err());
    }

    #[test]
    fn test_new_social_hook_preview_defaults() {
        let twitter = NewSocialHook::new(FeedKind::Twitter, CALLBACK, vec![1]);
        assert_eq!(twitter.effective_preview_length(), 280);
        let rss = NewSocialHook::new(FeedKind::Rss, CALLBACK, vec![1]);
        assert_eq!(rss.effective_preview_length(), 2000);
        let custom = rss.with_preview_length(50);
        assert_eq!(custom.effective_preview_length(), 50);
    }

    #[test]
    fn test_new_social_hook_validation() {
        assert!(NewSocialHook::new(FeedKind::Rss, CALLBACK, vec![1])
            .validate()
            .is_ok());
        assert!(NewSocialHook::new(FeedKind::Rss, "ftp://x", vec![1])
            .validate()
            .is_err());
        assert!(NewSocialHook::new(FeedKind::Rss, CALLBACK, vec![])
            .validate()
            .is_err());
        assert!(NewSocialHook::new(FeedKind::Almanax, CALLBACK, vec![1])
            .validate()
            .is_err());
    }

    #[test]
    fn test_new_social_hook_lowercases_terms() {
        let hook = NewSocialHook::new(FeedKind::Rss, CALLBACK, vec![1])
            .with_whitelist(vec!["Loot".to_string()]);
        assert_eq!(hook.whitelist, vec!["loot".to_string()]);
    }

    #[test]
    fn test_weekday_translations() {
        let mut t = WeekdayTranslations::new();
        t.insert("de", "Saturday", "Samstag");
        assert_eq!(t.get("de", "Saturday"), Some("Samstag"));
        assert_eq!(t.get("fr", "Saturday"), None);
    }
}
