use std::time::Duration;

use crate::{Criterion, Effect, JobState, LogKind, Msg, Phase};

/// Pause between the total-count reply and the first batch, so the first
/// progress render lands before the network call goes out.
pub const FIRST_BATCH_DELAY: Duration = Duration::from_millis(500);
/// Politeness pause between successive batches.
pub const INTER_BATCH_DELAY: Duration = Duration::from_secs(1);
/// Back-off before retrying a timed-out batch at the same offset.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Initial page width for a job of `total` images. Smaller lots bound
/// per-call latency for small libraries; the cap bounds server load for
/// large ones. Monotonically non-decreasing in `total`.
pub fn initial_batch_size(total: u64) -> u32 {
    if total <= 10 {
        2
    } else if total <= 50 {
        3
    } else if total <= 200 {
        5
    } else {
        8
    }
}

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: JobState, msg: Msg) -> (JobState, Vec<Effect>) {
    let effects = match msg {
        Msg::StartClicked { criterion } => {
            if state.is_active() {
                Vec::new()
            } else if criterion == Criterion::All {
                // Touching the whole library needs an explicit yes first.
                vec![Effect::ConfirmStart { criterion }]
            } else {
                begin_job(&mut state, criterion)
            }
        }
        Msg::StartConfirmed { criterion } => {
            if state.is_active() {
                Vec::new()
            } else {
                begin_job(&mut state, criterion)
            }
        }
        Msg::TotalReceived { total } => {
            if state.phase() != Phase::Counting {
                return (state, Vec::new());
            }
            if total == 0 {
                state.push_log(
                    LogKind::Notice,
                    "No images matched the selected criterion.",
                );
                state.set_phase(Phase::Completed);
                return (state, Vec::new());
            }
            state.set_total(total);
            let batch_size = initial_batch_size(total);
            state.set_batch_size(batch_size);
            state.push_log(LogKind::Info, format!("Total images to process: {total}"));
            state.push_log(
                LogKind::Info,
                format!("Processing in batches of {batch_size} images..."),
            );
            state.set_phase(Phase::Processing);
            vec![Effect::ScheduleBatch {
                delay: FIRST_BATCH_DELAY,
            }]
        }
        Msg::CountFailed { message } => {
            if state.phase() != Phase::Counting {
                return (state, Vec::new());
            }
            fail_job(&mut state, format!("Failed to count images: {message}"));
            Vec::new()
        }
        Msg::BatchDue => {
            if !matches!(state.phase(), Phase::Processing | Phase::RetryWait) {
                return (state, Vec::new());
            }
            if state.stop_requested() {
                finish_stopped(&mut state);
                Vec::new()
            } else {
                state.set_phase(Phase::Processing);
                vec![Effect::RequestBatch {
                    offset: state.offset(),
                    batch_size: state.batch_size(),
                    criterion: state.criterion(),
                }]
            }
        }
        Msg::BatchSucceeded {
            processed_count,
            log,
        } => {
            if state.phase() != Phase::Processing {
                return (state, Vec::new());
            }
            state.extend_log(log);
            state.record_batch(processed_count);
            if processed_count == 0 || state.processed() >= state.total() {
                // A zero-progress page means the matching set is exhausted;
                // that is normal completion, not an error.
                state.clear_stop();
                state.push_log(
                    LogKind::Success,
                    format!(
                        "Bulk processing complete. {} images processed.",
                        state.processed()
                    ),
                );
                state.set_phase(Phase::Completed);
                Vec::new()
            } else {
                vec![Effect::ScheduleBatch {
                    delay: INTER_BATCH_DELAY,
                }]
            }
        }
        Msg::BatchTimedOut => {
            if state.phase() != Phase::Processing {
                return (state, Vec::new());
            }
            let shrunk = (state.batch_size() / 2).max(1);
            state.set_batch_size(shrunk);
            state.push_log(
                LogKind::Error,
                format!("Batch timed out. Retrying with batches of {shrunk}..."),
            );
            state.set_phase(Phase::RetryWait);
            vec![Effect::ScheduleBatch { delay: RETRY_DELAY }]
        }
        Msg::BatchFailed { message } => {
            if state.phase() != Phase::Processing {
                return (state, Vec::new());
            }
            fail_job(&mut state, format!("Batch request failed: {message}"));
            Vec::new()
        }
        Msg::StopClicked => {
            if state.is_active() && !state.stop_requested() {
                vec![Effect::ConfirmStop]
            } else {
                Vec::new()
            }
        }
        Msg::StopConfirmed => {
            if state.is_active() && !state.stop_requested() {
                state.request_stop();
                state.push_log(LogKind::Notice, "Stopping after the current batch...");
            }
            Vec::new()
        }
        Msg::ClearLogClicked => {
            state.clear_log();
            Vec::new()
        }
        Msg::ExportLogClicked => {
            vec![Effect::ExportLog {
                lines: state.export_log(),
            }]
        }
        Msg::Tick => Vec::new(),
    };

    (state, effects)
}

fn begin_job(state: &mut JobState, criterion: Criterion) -> Vec<Effect> {
    state.begin(criterion);
    state.push_log(LogKind::Info, "Starting bulk processing...");
    vec![Effect::RequestTotal { criterion }]
}

fn finish_stopped(state: &mut JobState) {
    state.clear_stop();
    state.push_log(
        LogKind::Notice,
        format!(
            "Processing stopped by operator. {} images processed.",
            state.processed()
        ),
    );
    state.set_phase(Phase::Stopped);
}

fn fail_job(state: &mut JobState, message: String) {
    state.push_log(LogKind::Error, message);
    state.set_phase(Phase::Error);
}
