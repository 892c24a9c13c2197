use crate::{Criterion, LogLine};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Operator clicked Start with the given criterion selected.
    StartClicked { criterion: Criterion },
    /// Operator answered yes to the process-everything confirmation.
    StartConfirmed { criterion: Criterion },
    /// Count reply from the worker.
    TotalReceived { total: u64 },
    /// Count request failed at the transport level.
    CountFailed { message: String },
    /// The scheduled inter-batch (or retry) delay elapsed.
    BatchDue,
    /// Batch reply from the worker: images attempted plus their log lines.
    BatchSucceeded {
        processed_count: u64,
        log: Vec<LogLine>,
    },
    /// The batch call hit its transport timeout. Recoverable.
    BatchTimedOut,
    /// Any other transport failure. Fatal for the job.
    BatchFailed { message: String },
    /// Operator clicked Stop.
    StopClicked,
    /// Operator answered yes to the stop confirmation.
    StopConfirmed,
    /// Operator cleared the activity log.
    ClearLogClicked,
    /// Operator requested a log export.
    ExportLogClicked,
    /// UI/render tick to coalesce rendering.
    Tick,
}
