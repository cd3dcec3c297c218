//! Tick loops and delivery.
//!
//! A [`Listener`] owns one feed and its poll state. On every tick it asks
//! its [`FeedHandler`] for send jobs, renders them and hands the messages to
//! the [`Dispatcher`].

mod batch;
mod dispatch;
mod handler;
mod listener;
mod stats;

pub use batch::{BatchOutcome, BatchSender};
pub use dispatch::{classify, DispatchReport, Dispatcher, Outcome, USER_AGENT};
pub use handler::FeedHandler;
pub use listener::{Listener, ListenerGroup, TickReport};
pub use stats::{DeliveryStats, StatsSnapshot};
