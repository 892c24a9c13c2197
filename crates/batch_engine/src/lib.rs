//! Batch engine: worker orchestration, transport client, and the per-image
//! pipeline with its external-collaborator seams.
mod codec;
mod describe;
mod filename;
mod handle;
mod persist;
mod pipeline;
mod store;
mod transport;
mod types;
mod wire;
mod worker;

pub use codec::{Codec, CodecError, CompressOutcome, ReencodeCodec};
pub use describe::{
    clean_model_reply, DescribeError, DescribeFailure, Describer, DescriberSettings,
    GeminiDescriber, Prompt,
};
pub use filename::title_slug;
pub use handle::{TransportEvent, TransportHandle, TransportSender};
pub use persist::{ensure_dir, AtomicFileWriter, PersistError};
pub use pipeline::{ImagePipeline, PipelineSettings};
pub use store::{
    DirMediaStore, ImageMetadata, ImageRecord, MediaStore, MemoryMediaStore, StoreError,
};
pub use transport::{
    BatchTransport, DirectBatchTransport, HttpBatchTransport, TransportSettings,
};
pub use types::{
    BatchOutcome, Criterion, ImageId, LogKind, LogMessage, TransportError, TransportFailure,
};
pub use wire::{BatchData, BatchRequest, CountData, CountRequest, WireLogMessage};
pub use worker::{BatchWorker, WorkerError};
