//! Content feeds (RSS and Atom).
//!
//! Each poll compares the feed against the newest item of the previous
//! poll and forwards what is new to the matching subscribers.

mod decision;
mod fetcher;
mod render;

pub use decision::{detect_new, fingerprint, Detection, Fingerprint, RssHandler, RssJob, RssState};
pub use fetcher::{parse_feed, strip_html, FeedItem, RssFetcher};
pub use render::{find_image_url, render_item, username};
