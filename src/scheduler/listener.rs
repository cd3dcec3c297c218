//! Per-feed tick loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::dispatch::{DispatchReport, Dispatcher};
use super::handler::FeedHandler;
use crate::hooks::{Feed, HookRepository};
use crate::Result;

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Send jobs decided.
    pub jobs: usize,
    /// Messages rendered.
    pub messages: usize,
    pub delivery: DispatchReport,
}

/// Polls one feed on a fixed period.
///
/// The poll state lives here and is only touched by this listener's task.
pub struct Listener<H: FeedHandler> {
    handler: Arc<H>,
    feed: H::Feed,
    state: H::State,
    period: Duration,
    start_delay: Duration,
    repo: Arc<dyn HookRepository>,
    dispatcher: Dispatcher,
}

impl<H: FeedHandler> Listener<H> {
    pub fn new(
        handler: Arc<H>,
        feed: H::Feed,
        state: H::State,
        period: Duration,
        repo: Arc<dyn HookRepository>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            handler,
            feed,
            state,
            period,
            start_delay: Duration::ZERO,
            repo,
            dispatcher,
        }
    }

    /// Wait this long before arming the timer.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    pub fn feed(&self) -> &H::Feed {
        &self.feed
    }

    pub fn state(&self) -> &H::State {
        &self.state
    }

    /// Run one tick: decide, render, deliver.
    pub async fn tick(&mut self, tick: DateTime<Utc>) -> Result<TickReport> {
        let jobs = self
            .handler
            .decide(
                &self.feed,
                &mut self.state,
                tick,
                self.period,
                self.repo.as_ref(),
            )
            .await?;

        if jobs.is_empty() {
            debug!("Feed {}: nothing to send", self.feed.name());
            return Ok(TickReport::default());
        }

        self.dispatcher
            .stats()
            .record_jobs(self.handler.kind(), jobs.len());

        let mut messages = Vec::new();
        for job in &jobs {
            match self.handler.render(&self.feed, job) {
                Ok(mut rendered) => messages.append(&mut rendered),
                Err(e) => warn!("Error rendering job for feed {}: {}", self.feed.name(), e),
            }
        }

        let rendered = messages.len();
        let delivery = self.dispatcher.dispatch(messages).await;
        info!(
            "Feed {}: {} job(s), {} message(s), {} delivered, {} deregistered, {} anomalous",
            self.feed.name(),
            jobs.len(),
            rendered,
            delivery.delivered,
            delivery.deregistered,
            delivery.anomalous
        );
        debug!("Delivery stats: {:?}", self.dispatcher.stats().snapshot());

        Ok(TickReport {
            jobs: jobs.len(),
            messages: rendered,
            delivery,
        })
    }

    /// Tick until shutdown is signalled.
    ///
    /// A failed tick is logged and the loop waits for the next one.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            "Listener for {} feed {} started (period: {} seconds)",
            self.handler.kind(),
            self.feed.name(),
            self.period.as_secs()
        );

        if !self.start_delay.is_zero() {
            tokio::select! {
                _ = shutdown_rx.changed() => return,
                _ = tokio::time::sleep(self.start_delay) => {}
            }
        }

        let mut timer = interval_at(Instant::now() + self.period, self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = timer.tick() => {}
            }

            if let Err(e) = self.tick(Utc::now()).await {
                error!("Error in tick for feed {}: {}", self.feed.name(), e);
            }
        }

        info!("Listener for feed {} stopped", self.feed.name());
    }
}

/// Running listeners and their shared shutdown signal.
pub struct ListenerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl ListenerGroup {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shutdown_tx,
            joins: Vec::new(),
        }
    }

    /// Spawn a listener onto the runtime.
    pub fn spawn<H: FeedHandler>(&mut self, listener: Listener<H>) {
        let rx = self.shutdown_tx.subscribe();
        self.joins.push(tokio::spawn(listener.run(rx)));
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Signal every listener to stop after its current tick.
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Signal shutdown and wait for every listener to return.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for result in futures::future::join_all(self.joins).await {
            if let Err(e) = result {
                error!("Listener task failed: {}", e);
            }
        }
    }
}

impl Default for ListenerGroup {
    fn default() -> Self {
        Self::new()
    }
}
