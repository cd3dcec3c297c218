//! Per-kind firing decision and rendering contract.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::discord::PreparedHook;
use crate::hooks::{Feed, FeedKind, HookRepository};
use crate::Result;

/// Decides what a feed sends on a tick and renders it.
///
/// One implementation exists per feed kind; the [`Listener`](super::Listener)
/// drives any of them.
#[async_trait]
pub trait FeedHandler: Send + Sync + 'static {
    /// Feed variant this handler polls.
    type Feed: Feed;
    /// Poll state kept between ticks.
    type State: Send + 'static;
    /// Send job produced by a decision.
    type Job: Send + Sync + 'static;

    fn kind(&self) -> FeedKind;

    /// Produce the send jobs for one tick.
    ///
    /// `interval` is the listener period; `state` is owned by the listener
    /// and only mutated here.
    async fn decide(
        &self,
        feed: &Self::Feed,
        state: &mut Self::State,
        tick: DateTime<Utc>,
        interval: Duration,
        repo: &dyn HookRepository,
    ) -> Result<Vec<Self::Job>>;

    /// Render one job into messages, one per recipient.
    fn render(&self, feed: &Self::Feed, job: &Self::Job) -> Result<Vec<PreparedHook>>;
}
