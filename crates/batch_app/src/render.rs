use batch_core::{BulkViewModel, LogLine, Phase};
use chrono::Local;

use crate::effects::kind_tag;

/// Console renderer. Emits each new activity-log line once with a
/// timestamp, and a progress line whenever the counters move.
pub(crate) struct ConsoleRenderer {
    last_progress: String,
    last_phase: Phase,
    last_log: Vec<LogLine>,
}

impl ConsoleRenderer {
    pub fn new() -> Self {
        Self {
            last_progress: String::new(),
            last_phase: Phase::Idle,
            last_log: Vec::new(),
        }
    }

    pub fn render(&mut self, view: &BulkViewModel) {
        self.emit_new_lines(&view.log);

        if view.total > 0 && view.progress_label != self.last_progress {
            let mut line = format!("progress: {}", view.progress_label);
            if view.stopping {
                line.push_str(" (stopping)");
            }
            println!("{line}");
            self.last_progress = view.progress_label.clone();
        }

        if view.phase != self.last_phase {
            if let Some(announcement) = phase_announcement(view.phase) {
                println!("{announcement}");
            }
            self.last_phase = view.phase;
        }
    }

    /// The display log is a capped ring, so new lines are everything past
    /// the point where the previously rendered log ends.
    fn emit_new_lines(&mut self, log: &[LogLine]) {
        let skip = if log.len() >= self.last_log.len()
            && log[..self.last_log.len()] == self.last_log[..]
        {
            self.last_log.len()
        } else {
            match self
                .last_log
                .last()
                .and_then(|last| log.iter().rposition(|line| line == last))
            {
                Some(position) => position + 1,
                // The log was cleared or fully replaced.
                None => 0,
            }
        };

        let stamp = Local::now().format("%H:%M:%S");
        for line in &log[skip..] {
            println!("{stamp} [{}] {}", kind_tag(line.kind), line.message);
        }
        self.last_log = log.to_vec();
    }
}

fn phase_announcement(phase: Phase) -> Option<&'static str> {
    match phase {
        Phase::Counting => Some("Counting matching images..."),
        Phase::RetryWait => Some("Batch timed out; retrying with a smaller batch."),
        Phase::Completed => Some("Bulk processing completed."),
        Phase::Stopped => Some("Bulk processing stopped."),
        Phase::Error => Some("Bulk processing failed; see the log above."),
        Phase::Idle | Phase::Processing => None,
    }
}
