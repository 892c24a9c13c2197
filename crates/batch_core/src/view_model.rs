use crate::{JobState, LogLine, Phase};

/// Snapshot of everything the operator-facing surface renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkViewModel {
    pub phase: Phase,
    pub total: u64,
    pub processed: u64,
    pub batch_size: u32,
    /// Integer percentage of `min(processed, total)` against `total`.
    pub percent: u8,
    /// e.g. `"12 / 40 (30%)"`.
    pub progress_label: String,
    pub start_enabled: bool,
    pub stop_enabled: bool,
    /// A stop has been requested but the current batch is still running.
    pub stopping: bool,
    pub log: Vec<LogLine>,
}

impl JobState {
    pub fn view(&self) -> BulkViewModel {
        let clamped = self.processed().min(self.total());
        let percent = if self.total() > 0 {
            ((clamped as f64 / self.total() as f64) * 100.0).round() as u8
        } else {
            0
        };
        BulkViewModel {
            phase: self.phase(),
            total: self.total(),
            processed: self.processed(),
            batch_size: self.batch_size(),
            percent,
            progress_label: format!("{clamped} / {} ({percent}%)", self.total()),
            start_enabled: !self.is_active(),
            stop_enabled: self.is_active() && !self.stop_requested(),
            stopping: self.is_active() && self.stop_requested(),
            log: self.log_lines().cloned().collect(),
        }
    }
}
