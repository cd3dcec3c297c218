//! Almanax calendar feeds.
//!
//! Subscribers get a daily message at their local offset hour, and optional
//! weekly or monthly summaries of the days ahead.

mod client;
mod decision;
mod locale;
mod render;

pub use client::{
    AlmanaxCalendar, AlmanaxClient, AlmanaxEntry, Bonus, BonusType, ImageUrls, Tribute,
    TributeItem,
};
pub use decision::{
    firing_intervals, plan, preview_mentions, summary_span, AlmanaxHandler, AlmanaxJob, Preview,
};
pub use locale::{date_label, format_date};
pub use render::{format_kamas, mention_tags, render_job};
