use std::time::Duration;

use crate::{Criterion, LogLine};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the operator to confirm processing the entire library.
    ConfirmStart { criterion: Criterion },
    /// Ask the operator to confirm stopping the running job.
    ConfirmStop,
    /// Issue a count request for the criterion.
    RequestTotal { criterion: Criterion },
    /// After `delay`, post [`crate::Msg::BatchDue`] back into the loop.
    ScheduleBatch { delay: Duration },
    /// Issue one batch request. At most one may be in flight at a time.
    RequestBatch {
        offset: u64,
        batch_size: u32,
        criterion: Criterion,
    },
    /// Write the current log lines somewhere the operator can keep them.
    ExportLog { lines: Vec<LogLine> },
}
