//! Twitter timeline feeds.
//!
//! Each tick fetches the posts of the last polling period and forwards the
//! top-level ones to the matching subscribers.

mod client;
mod decision;
mod render;

pub use client::{Tweet, TwitterClient, TwitterUser};
pub use decision::{recipients_for, TwitterHandler, TwitterJob};
pub use render::render_tweet;
