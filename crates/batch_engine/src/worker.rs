use batch_logging::{batch_info, set_page_offset};
use thiserror::Error;

use crate::pipeline::ImagePipeline;
use crate::store::{MediaStore, StoreError};
use crate::wire::{BatchData, BatchRequest, CountData, CountRequest};

/// Structural failures at the worker boundary. These surface as
/// transport-level errors to the controller; per-image pipeline failures
/// never appear here.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("authenticity token rejected")]
    InvalidToken,
    #[error("malformed request: {0}")]
    InvalidRequest(&'static str),
    #[error("media store failure: {0}")]
    Store(#[from] StoreError),
}

/// Stateless request handler: each call independently counts or selects a
/// page and runs the pipeline over it. Statelessness across calls is what
/// makes offset-based resumption safe.
pub struct BatchWorker<S: MediaStore> {
    store: S,
    pipeline: ImagePipeline,
    token: String,
}

impl<S: MediaStore> BatchWorker<S> {
    pub fn new(store: S, pipeline: ImagePipeline, token: impl Into<String>) -> Self {
        Self {
            store,
            pipeline,
            token: token.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn verify_token(&self, token: &str) -> Result<(), WorkerError> {
        if token != self.token {
            return Err(WorkerError::InvalidToken);
        }
        Ok(())
    }

    pub async fn handle_count(&self, request: &CountRequest) -> Result<CountData, WorkerError> {
        self.verify_token(&request.token)?;
        let total = self.store.count_matching(request.criterion)?;
        batch_info!("count request: criterion={:?} total={total}", request.criterion);
        Ok(CountData { total })
    }

    pub async fn handle_batch(&self, request: &BatchRequest) -> Result<BatchData, WorkerError> {
        self.verify_token(&request.token)?;
        if request.batch_size == 0 {
            return Err(WorkerError::InvalidRequest("batch_size must be at least 1"));
        }

        set_page_offset(request.offset);
        let page = self
            .store
            .select_page(request.offset, request.batch_size, request.criterion)?;
        batch_info!(
            "batch request: offset={} size={} criterion={:?} page_len={}",
            request.offset,
            request.batch_size,
            request.criterion,
            page.len()
        );

        // One image at a time: shared model quota and codec memory are
        // rate-limited purely by this sequencing.
        let mut log = Vec::new();
        for record in &page {
            self.pipeline.run(&self.store, record, &mut log).await;
        }

        Ok(BatchData {
            processed_count: page.len() as u64,
            log_messages: log.into_iter().map(Into::into).collect(),
        })
    }
}
