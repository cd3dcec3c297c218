//! Delivery through an external batch sender.
//!
//! The sender receives every prepared message of a tick in one request and
//! answers with the callbacks it could not deliver.

use reqwest::{Client, StatusCode};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::discord::PreparedHook;
use crate::hooks::HookRepository;
use crate::{HookError, Result};

#[derive(Debug, Serialize)]
struct BatchJobs<'a> {
    jobs: Vec<BatchJob<'a>>,
}

#[derive(Debug, Serialize)]
struct BatchJob<'a> {
    url: &'a str,
    json_body: &'a str,
}

/// Counts from one batch round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub delivered: usize,
    pub removed: usize,
}

/// Client for the batch sender endpoint.
#[derive(Debug, Clone)]
pub struct BatchSender {
    client: Client,
    url: String,
}

impl BatchSender {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Submit messages and return the callbacks that failed.
    pub async fn send(&self, hooks: &[PreparedHook]) -> Result<Vec<String>> {
        let payload = BatchJobs {
            jobs: hooks
                .iter()
                .map(|h| BatchJob {
                    url: &h.callback,
                    json_body: &h.body,
                })
                .collect(),
        };

        let response = self.client.post(&self.url).json(&payload).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(HookError::Upstream(format!(
                "batch sender returned status {status}"
            )));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(HookError::Upstream(
                "batch sender returned empty body".to_string(),
            ));
        }

        let failed: Vec<String> = serde_json::from_str(&body)?;
        debug!("Batch sender: {} of {} failed", failed.len(), hooks.len());
        Ok(failed)
    }

    /// Submit messages, deregister every failed callback and stamp the rest.
    pub async fn send_and_clean_failed(
        &self,
        hooks: &[PreparedHook],
        repo: &dyn HookRepository,
        write_lock: &Mutex<()>,
    ) -> Result<BatchOutcome> {
        let failed = self.send(hooks).await?;

        let _guard = write_lock.lock().await;
        let mut outcome = BatchOutcome::default();
        for callback in &failed {
            match repo.delete_by_callback(callback).await {
                Ok(_) => outcome.removed += 1,
                Err(e) => warn!("Could not delete webhook {}: {}", callback, e),
            }
        }
        for hook in hooks.iter().filter(|h| !failed.contains(&h.callback)) {
            outcome.delivered += 1;
            if let Err(e) = repo.fire_stamp(&hook.callback).await {
                warn!("Could not stamp webhook {}: {}", hook.callback, e);
            }
        }
        Ok(outcome)
    }
}
