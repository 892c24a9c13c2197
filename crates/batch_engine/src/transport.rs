use std::sync::Arc;
use std::time::Duration;

use crate::wire::{BatchData, BatchRequest, CountData, CountRequest, Envelope};
use crate::worker::{BatchWorker, WorkerError};
use crate::{BatchOutcome, Criterion, MediaStore, TransportError, TransportFailure};

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub connect_timeout: Duration,
    /// Upper bound for one batch call; long enough for several model calls
    /// per image, short enough to fail closed rather than hang.
    pub batch_timeout: Duration,
    pub count_timeout: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            batch_timeout: Duration::from_secs(120),
            count_timeout: Duration::from_secs(30),
        }
    }
}

/// Client side of the two-request worker protocol.
#[async_trait::async_trait]
pub trait BatchTransport: Send + Sync {
    /// Count images matching `criterion`. Idempotent, safe to repeat.
    async fn count(&self, criterion: Criterion) -> Result<u64, TransportError>;

    /// Process one page. Not idempotent: re-running an offset after partial
    /// success may reprocess already-touched images.
    async fn process_batch(
        &self,
        offset: u64,
        batch_size: u32,
        criterion: Criterion,
    ) -> Result<BatchOutcome, TransportError>;
}

/// HTTP implementation speaking JSON to a remote worker endpoint.
#[derive(Debug, Clone)]
pub struct HttpBatchTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
    settings: TransportSettings,
}

impl HttpBatchTransport {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        settings: TransportSettings,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| TransportError::new(TransportFailure::Network, err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            settings,
        })
    }

    async fn post_envelope<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<serde_json::Value, TransportError> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(TransportError::new(
                TransportFailure::Auth,
                status.to_string(),
            ));
        }
        if !status.is_success() {
            return Err(TransportError::new(
                TransportFailure::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let envelope: Envelope = response.json().await.map_err(|err| {
            if err.is_timeout() {
                TransportError::new(TransportFailure::Timeout, err.to_string())
            } else {
                TransportError::new(TransportFailure::InvalidResponse, err.to_string())
            }
        })?;

        if !envelope.success {
            let message = envelope
                .rejection_message()
                .unwrap_or_else(|| "worker reported failure".to_string());
            return Err(TransportError::new(TransportFailure::Rejected, message));
        }
        envelope.data.ok_or_else(|| {
            TransportError::new(TransportFailure::InvalidResponse, "missing data field")
        })
    }
}

#[async_trait::async_trait]
impl BatchTransport for HttpBatchTransport {
    async fn count(&self, criterion: Criterion) -> Result<u64, TransportError> {
        let request = CountRequest {
            criterion,
            token: self.token.clone(),
        };
        let data = self
            .post_envelope("count", &request, self.settings.count_timeout)
            .await?;
        let data: CountData = serde_json::from_value(data).map_err(|err| {
            TransportError::new(TransportFailure::InvalidResponse, err.to_string())
        })?;
        Ok(data.total)
    }

    async fn process_batch(
        &self,
        offset: u64,
        batch_size: u32,
        criterion: Criterion,
    ) -> Result<BatchOutcome, TransportError> {
        let request = BatchRequest {
            offset,
            batch_size,
            criterion,
            token: self.token.clone(),
        };
        let data = self
            .post_envelope("batch", &request, self.settings.batch_timeout)
            .await?;
        let data: BatchData = serde_json::from_value(data).map_err(|err| {
            TransportError::new(TransportFailure::InvalidResponse, err.to_string())
        })?;
        Ok(BatchOutcome {
            processed_count: data.processed_count,
            log: data.log_messages.into_iter().map(Into::into).collect(),
        })
    }
}

/// In-process transport driving a [`BatchWorker`] directly. Used by local
/// mode and integration tests; it still exercises the token check.
pub struct DirectBatchTransport<S: MediaStore> {
    worker: Arc<BatchWorker<S>>,
    token: String,
}

impl<S: MediaStore> DirectBatchTransport<S> {
    pub fn new(worker: Arc<BatchWorker<S>>, token: impl Into<String>) -> Self {
        Self {
            worker,
            token: token.into(),
        }
    }
}

#[async_trait::async_trait]
impl<S: MediaStore> BatchTransport for DirectBatchTransport<S> {
    async fn count(&self, criterion: Criterion) -> Result<u64, TransportError> {
        let request = CountRequest {
            criterion,
            token: self.token.clone(),
        };
        let data = self
            .worker
            .handle_count(&request)
            .await
            .map_err(map_worker_error)?;
        Ok(data.total)
    }

    async fn process_batch(
        &self,
        offset: u64,
        batch_size: u32,
        criterion: Criterion,
    ) -> Result<BatchOutcome, TransportError> {
        let request = BatchRequest {
            offset,
            batch_size,
            criterion,
            token: self.token.clone(),
        };
        let data = self
            .worker
            .handle_batch(&request)
            .await
            .map_err(map_worker_error)?;
        Ok(BatchOutcome {
            processed_count: data.processed_count,
            log: data.log_messages.into_iter().map(Into::into).collect(),
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::new(TransportFailure::Timeout, err.to_string());
    }
    TransportError::new(TransportFailure::Network, err.to_string())
}

fn map_worker_error(err: WorkerError) -> TransportError {
    match err {
        WorkerError::InvalidToken => {
            TransportError::new(TransportFailure::Auth, "authenticity token rejected")
        }
        other => TransportError::new(TransportFailure::Rejected, other.to_string()),
    }
}
