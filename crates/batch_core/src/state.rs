use std::collections::VecDeque;

/// Maximum number of log lines retained for display; older lines are
/// evicted first.
pub const LOG_CAP: usize = 100;

/// Filter predicate selecting which images a job is eligible to touch.
///
/// Count and page selection must apply the same predicate, otherwise the
/// controller loop cannot terminate cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Criterion {
    /// Only images with no alt text yet.
    #[default]
    MissingAlt,
    /// Every image in the library. Requires operator confirmation.
    All,
}

impl Criterion {
    pub fn as_str(self) -> &'static str {
        match self {
            Criterion::MissingAlt => "missing_alt",
            Criterion::All => "all",
        }
    }
}

/// Controller phase. Terminal phases re-arm the start control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Waiting for the total-count reply.
    Counting,
    /// A batch is scheduled or in flight.
    Processing,
    /// A batch timed out; a shrunk retry is scheduled for the same offset.
    RetryWait,
    Completed,
    Stopped,
    Error,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Idle | Phase::Completed | Phase::Stopped | Phase::Error)
    }
}

/// Severity tag carried by every operator-visible log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Success,
    Error,
    Notice,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub kind: LogKind,
    pub message: String,
}

impl LogLine {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// All controller-owned job state. Lives for one job; the next start
/// resets it. Never mutated by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobState {
    phase: Phase,
    criterion: Criterion,
    total: u64,
    processed: u64,
    offset: u64,
    batch_size: u32,
    should_stop: bool,
    log: VecDeque<LogLine>,
    dirty: bool,
}

impl JobState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn criterion(&self) -> Criterion {
        self.criterion
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    pub fn stop_requested(&self) -> bool {
        self.should_stop
    }

    /// True while a job is running in any non-terminal phase.
    pub fn is_active(&self) -> bool {
        !self.phase.is_terminal()
    }

    /// Returns whether the state changed since the last call and clears
    /// the flag. The platform layer uses this to coalesce rendering.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn log_lines(&self) -> impl Iterator<Item = &LogLine> {
        self.log.iter()
    }

    pub(crate) fn begin(&mut self, criterion: Criterion) {
        *self = Self {
            phase: Phase::Counting,
            criterion,
            dirty: true,
            ..Self::default()
        };
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.dirty = true;
    }

    pub(crate) fn set_total(&mut self, total: u64) {
        self.total = total;
        self.dirty = true;
    }

    pub(crate) fn set_batch_size(&mut self, batch_size: u32) {
        debug_assert!(batch_size >= 1);
        self.batch_size = batch_size;
        self.dirty = true;
    }

    /// Records one successful batch: counts accumulate and the cursor
    /// advances by the requested page width, not the returned count.
    pub(crate) fn record_batch(&mut self, processed_count: u64) {
        self.processed += processed_count;
        self.offset += u64::from(self.batch_size);
        self.dirty = true;
    }

    pub(crate) fn request_stop(&mut self) {
        self.should_stop = true;
        self.dirty = true;
    }

    pub(crate) fn clear_stop(&mut self) {
        self.should_stop = false;
    }

    pub(crate) fn push_log(&mut self, kind: LogKind, message: impl Into<String>) {
        if self.log.len() == LOG_CAP {
            self.log.pop_front();
        }
        self.log.push_back(LogLine::new(kind, message));
        self.dirty = true;
    }

    pub(crate) fn extend_log(&mut self, lines: Vec<LogLine>) {
        for line in lines {
            self.push_log(line.kind, line.message);
        }
    }

    pub(crate) fn clear_log(&mut self) {
        self.log.clear();
        self.dirty = true;
    }

    pub(crate) fn export_log(&self) -> Vec<LogLine> {
        self.log.iter().cloned().collect()
    }
}
