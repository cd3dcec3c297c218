//! Concurrent delivery of prepared messages.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use super::batch::BatchSender;
use super::stats::DeliveryStats;
use crate::config::DeliveryConfig;
use crate::discord::PreparedHook;
use crate::hooks::HookRepository;
use crate::{HookError, Result};

/// User agent for outbound deliveries.
pub const USER_AGENT: &str = "ankama-discord-hooks";

/// Classified result of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Accepted with 204; the subscriber gets a last-fired stamp.
    Delivered,
    /// Transport failure or 404; the subscriber is deregistered.
    Gone,
    /// Any other status; logged only.
    Anomalous(u16),
}

/// Classify a delivery attempt. `None` means the request never got a response.
pub fn classify(status: Option<StatusCode>) -> Outcome {
    match status {
        None | Some(StatusCode::NOT_FOUND) => Outcome::Gone,
        Some(StatusCode::NO_CONTENT) => Outcome::Delivered,
        Some(other) => Outcome::Anomalous(other.as_u16()),
    }
}

#[derive(Debug)]
struct DeliveryResult {
    callback: String,
    outcome: Outcome,
}

/// Summary of one dispatch round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub deregistered: usize,
    pub anomalous: usize,
}

impl DispatchReport {
    pub fn total(&self) -> usize {
        self.delivered + self.deregistered + self.anomalous
    }
}

/// Fans prepared messages out to their callbacks and applies the outcomes.
///
/// Clones share the HTTP client, the write lock and the counters.
#[derive(Clone)]
pub struct Dispatcher {
    client: Client,
    repo: Arc<dyn HookRepository>,
    write_lock: Arc<Mutex<()>>,
    stats: Arc<DeliveryStats>,
    batch: Option<BatchSender>,
}

impl Dispatcher {
    /// Create a dispatcher with its own HTTP client.
    pub fn new(repo: Arc<dyn HookRepository>, config: &DeliveryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HookError::Http(format!("failed to create HTTP client: {}", e)))?;

        let batch = if config.batch_enabled {
            Some(BatchSender::new(client.clone(), &config.batch_sender_url))
        } else {
            None
        };

        Ok(Self {
            client,
            repo,
            write_lock: Arc::new(Mutex::new(())),
            stats: Arc::new(DeliveryStats::new()),
            batch,
        })
    }

    /// Share a repository write lock with other dispatchers.
    pub fn with_write_lock(mut self, lock: Arc<Mutex<()>>) -> Self {
        self.write_lock = lock;
        self
    }

    /// Share delivery counters with other dispatchers.
    pub fn with_stats(mut self, stats: Arc<DeliveryStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Route deliveries through a batch sender instead of posting directly.
    pub fn with_batch_sender(mut self, sender: BatchSender) -> Self {
        self.batch = Some(sender);
        self
    }

    pub fn stats(&self) -> &Arc<DeliveryStats> {
        &self.stats
    }

    /// Deliver every message and apply the resulting repository mutations.
    ///
    /// Waits for exactly one result per message. Mutations run under the
    /// shared write lock after all results are in.
    pub async fn dispatch(&self, hooks: Vec<PreparedHook>) -> DispatchReport {
        if hooks.is_empty() {
            return DispatchReport::default();
        }

        if let Some(batch) = &self.batch {
            return self.dispatch_batch(batch, &hooks).await;
        }

        let expected = hooks.len();
        let (tx, mut rx) = mpsc::channel::<DeliveryResult>(expected);

        for hook in hooks {
            let client = self.client.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome = post(&client, &hook).await;
                let _ = tx
                    .send(DeliveryResult {
                        callback: hook.callback,
                        outcome,
                    })
                    .await;
            });
        }
        drop(tx);

        let mut results = Vec::with_capacity(expected);
        while results.len() < expected {
            match rx.recv().await {
                Some(result) => results.push(result),
                None => break,
            }
        }
        if results.len() < expected {
            error!("Lost {} delivery result(s)", expected - results.len());
        }

        self.apply(results).await
    }

    async fn apply(&self, results: Vec<DeliveryResult>) -> DispatchReport {
        let mut report = DispatchReport::default();
        let _guard = self.write_lock.lock().await;

        for result in results {
            match result.outcome {
                Outcome::Delivered => {
                    report.delivered += 1;
                    self.stats.record_delivered();
                    if let Err(e) = self.repo.fire_stamp(&result.callback).await {
                        error!("Could not stamp webhook {}: {}", result.callback, e);
                    }
                }
                Outcome::Gone => {
                    report.deregistered += 1;
                    self.stats.record_deregistered(1);
                    match self.repo.delete_by_callback(&result.callback).await {
                        Ok(n) => info!("Deregistered {} webhook(s) for {}", n, result.callback),
                        Err(e) => error!("Error deleting webhook {}: {}", result.callback, e),
                    }
                }
                Outcome::Anomalous(status) => {
                    report.anomalous += 1;
                    self.stats.record_anomalous();
                    warn!("Unexpected status {} from webhook {}", status, result.callback);
                }
            }
        }

        report
    }

    async fn dispatch_batch(&self, batch: &BatchSender, hooks: &[PreparedHook]) -> DispatchReport {
        match batch
            .send_and_clean_failed(hooks, self.repo.as_ref(), &self.write_lock)
            .await
        {
            Ok(outcome) => {
                for _ in 0..outcome.delivered {
                    self.stats.record_delivered();
                }
                self.stats.record_deregistered(outcome.removed as u64);
                DispatchReport {
                    delivered: outcome.delivered,
                    deregistered: outcome.removed,
                    anomalous: 0,
                }
            }
            Err(e) => {
                error!("Batch delivery failed: {}", e);
                DispatchReport::default()
            }
        }
    }
}

async fn post(client: &Client, hook: &PreparedHook) -> Outcome {
    let response = client
        .post(&hook.callback)
        .header(CONTENT_TYPE, "application/json")
        .body(hook.body.clone())
        .send()
        .await;

    match response {
        Ok(response) => {
            let status = response.status();
            debug!("Webhook {} answered {}", hook.callback, status);
            classify(Some(status))
        }
        Err(e) => {
            warn!("Error posting webhook {}: {}", hook.callback, e);
            classify(None)
        }
    }
}
