//! Feeds, webhooks and their persistence.

mod repository;
mod types;

pub use repository::{HookRepository, SqlHookRepository};
pub use types::{
    AlmanaxFeed, AlmanaxHook, Feed, FeedKind, Interval, Mention, Mentions, NewAlmanaxHook,
    NewSocialHook, RssFeed, SocialHook, TwitterFeed, WeekdayTranslations,
    DEFAULT_RSS_PREVIEW_LENGTH, DEFAULT_TWITTER_PREVIEW_LENGTH, MAX_MENTIONS,
    MAX_PING_DAYS_BEFORE, WEEKDAYS,
};
