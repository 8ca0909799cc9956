//! Waiting for a submitted transaction to show up on a group node.

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A transaction as returned by the node. Empty until the node has recorded it.
pub type TrxRecord = serde_json::Map<String, Value>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("node returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response body: {0}")]
    UnexpectedBody(String),

    #[error("invalid node url {url}")]
    InvalidUrl { url: String },
}

/// `attempts` counts fetches that completed before the poll stopped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PollError {
    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },

    #[error("timed out after {attempts} attempts ({elapsed:?})")]
    TimedOut { attempts: u32, elapsed: Duration },

    #[error("gave up after {attempts} attempts{}", .last_error.as_deref().map(|e| format!(": {}", e)).unwrap_or_default())]
    AttemptsExhausted {
        attempts: u32,
        last_error: Option<String>,
    },
}

/// Source of transaction records.
#[async_trait]
pub trait TrxFetcher: Send + Sync {
    async fn fetch_trx(&self, group_id: &str, trx_id: &str) -> Result<TrxRecord, FetchError>;
}

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches transactions from a node's HTTP API.
pub struct HttpTrxFetcher {
    client: Client,
    base_url: String,
}

impl HttpTrxFetcher {
    pub fn new(base_url: &str, request_timeout: Option<Duration>) -> Self {
        let client = Client::builder()
            .timeout(request_timeout.unwrap_or(CONNECTION_TIMEOUT))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `{base_url}/api/v1/trx/{group_id}/{trx_id}` with both ids percent-encoded.
    fn trx_url(&self, group_id: &str, trx_id: &str) -> Result<Url, FetchError> {
        let invalid = || FetchError::InvalidUrl {
            url: self.base_url.clone(),
        };

        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(["api", "v1", "trx", group_id, trx_id]);
        Ok(url)
    }
}

#[async_trait]
impl TrxFetcher for HttpTrxFetcher {
    async fn fetch_trx(&self, group_id: &str, trx_id: &str) -> Result<TrxRecord, FetchError> {
        let url = self.trx_url(group_id, trx_id)?;
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        match response.json::<Value>().await? {
            Value::Object(record) => Ok(record),
            Value::Null => Ok(TrxRecord::new()),
            other => Err(FetchError::UnexpectedBody(other.to_string())),
        }
    }
}

/// Bounds and pacing for [`wait_for_trx`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// `None` retries until the timeout or cancellation.
    pub max_attempts: Option<u32>,
    /// `None` waits until the attempt cap or cancellation.
    pub timeout: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(2000),
            max_delay: Duration::from_millis(4000),
            max_attempts: None,
            timeout: Some(Duration::from_secs(600)),
        }
    }
}

impl PollConfig {
    /// Uniform random delay in `[min_delay, max_delay)`.
    pub fn next_delay(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        let min = self.min_delay.as_nanos() as u64;
        let max = self.max_delay.as_nanos() as u64;
        Duration::from_nanos(rand::thread_rng().gen_range(min..max))
    }
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Poll `fetcher` until the transaction is visible.
///
/// An empty record and a fetch error are both treated as "not yet" and
/// retried after a randomized delay. The first non-empty record is returned
/// immediately.
pub async fn wait_for_trx<F>(
    fetcher: &F,
    group_id: &str,
    trx_id: &str,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<TrxRecord, PollError>
where
    F: TrxFetcher + ?Sized,
{
    let started = Instant::now();
    let deadline = config.timeout.map(|t| started + t);
    let mut attempts = 0u32;

    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled { attempts }),
            _ = deadline_reached(deadline) => {
                return Err(PollError::TimedOut { attempts, elapsed: started.elapsed() });
            }
            outcome = fetcher.fetch_trx(group_id, trx_id) => outcome,
        };
        attempts += 1;

        let last_error = match outcome {
            Ok(record) if !record.is_empty() => {
                tracing::info!(group_id, trx_id, attempts, "transaction confirmed");
                return Ok(record);
            }
            Ok(_) => {
                tracing::debug!(group_id, trx_id, attempts, "transaction not yet visible");
                None
            }
            Err(e) => {
                tracing::warn!(group_id, trx_id, attempts, "failed to fetch transaction: {}", e);
                Some(e.to_string())
            }
        };

        if config.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(PollError::AttemptsExhausted {
                attempts,
                last_error,
            });
        }

        let delay = config.next_delay();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled { attempts }),
            _ = deadline_reached(deadline) => {
                return Err(PollError::TimedOut { attempts, elapsed: started.elapsed() });
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
