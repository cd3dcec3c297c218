//! Ankama hooks - feed polling and webhook delivery.
//!
//! Listeners poll the Almanax calendar, RSS feeds and Twitter timelines on
//! fixed periods and deliver rendered messages to subscribed Discord
//! webhooks.

pub mod almanax;
pub mod config;
pub mod datetime;
pub mod db;
pub mod discord;
pub mod error;
pub mod filter;
pub mod hooks;
pub mod logging;
pub mod rss;
pub mod scheduler;
pub mod twitter;

pub use config::Config;
pub use db::{Database, DbPool};
pub use discord::{PreparedHook, Webhook};
pub use error::{HookError, Result};
pub use hooks::{FeedKind, HookRepository, SqlHookRepository};
pub use scheduler::{Dispatcher, FeedHandler, Listener, ListenerGroup};
