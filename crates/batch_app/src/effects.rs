use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use batch_core::{Criterion, Effect, LogKind, LogLine, Msg};
use batch_engine::{AtomicFileWriter, TransportEvent, TransportFailure, TransportSender};
use batch_logging::{batch_info, batch_warn};
use chrono::Local;

/// Runs controller effects against the transport and the filesystem.
/// Confirmation effects are handed back; the interactive loop owns those.
pub(crate) struct EffectRunner {
    transport: TransportSender,
    msg_tx: mpsc::Sender<Msg>,
    export_path: Option<PathBuf>,
}

impl EffectRunner {
    pub fn new(
        transport: TransportSender,
        msg_tx: mpsc::Sender<Msg>,
        export_path: Option<PathBuf>,
    ) -> Self {
        Self {
            transport,
            msg_tx,
            export_path,
        }
    }

    /// Runs every effect from one update pass, returning the confirmation
    /// effects the caller must answer.
    pub fn run(&self, effects: Vec<Effect>) -> Vec<Effect> {
        let mut interactive = Vec::new();
        for effect in effects {
            match effect {
                Effect::RequestTotal { criterion } => {
                    self.transport.request_count(map_criterion(criterion));
                }
                Effect::RequestBatch {
                    offset,
                    batch_size,
                    criterion,
                } => {
                    batch_info!("requesting batch: offset={offset} size={batch_size}");
                    self.transport
                        .request_batch(offset, batch_size, map_criterion(criterion));
                }
                Effect::ScheduleBatch { delay } => self.schedule(delay),
                Effect::ExportLog { lines } => self.export(&lines),
                confirm @ (Effect::ConfirmStart { .. } | Effect::ConfirmStop) => {
                    interactive.push(confirm);
                }
            }
        }
        interactive
    }

    fn schedule(&self, delay: Duration) {
        let msg_tx = self.msg_tx.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            let _ = msg_tx.send(Msg::BatchDue);
        });
    }

    fn export(&self, lines: &[LogLine]) {
        let (dir, filename) = match &self.export_path {
            Some(path) => {
                let dir = path
                    .parent()
                    .filter(|parent| !parent.as_os_str().is_empty())
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("."));
                let filename = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "batch-log.txt".to_string());
                (dir, filename)
            }
            None => {
                let stamp = Local::now().format("%Y%m%d-%H%M%S");
                (PathBuf::from("."), format!("batch-log-{stamp}.txt"))
            }
        };

        let mut content = String::new();
        for line in lines {
            content.push_str(&format!("[{}] {}\n", kind_tag(line.kind), line.message));
        }

        match AtomicFileWriter::new(dir).write(&filename, content.as_bytes()) {
            Ok(path) => {
                println!("Activity log exported to {}", path.display());
            }
            Err(err) => {
                batch_warn!("Log export failed: {}", err);
                println!("Log export failed: {err}");
            }
        }
    }
}

/// Maps a finished transport call onto the controller message it feeds.
/// A timeout is the one recoverable batch failure.
pub(crate) fn map_event(event: TransportEvent) -> Msg {
    match event {
        TransportEvent::CountCompleted { result } => match result {
            Ok(total) => Msg::TotalReceived { total },
            Err(err) => Msg::CountFailed {
                message: err.to_string(),
            },
        },
        TransportEvent::BatchCompleted { result } => match result {
            Ok(outcome) => Msg::BatchSucceeded {
                processed_count: outcome.processed_count,
                log: outcome.log.into_iter().map(map_log).collect(),
            },
            Err(err) if err.kind == TransportFailure::Timeout => Msg::BatchTimedOut,
            Err(err) => Msg::BatchFailed {
                message: err.to_string(),
            },
        },
    }
}

pub(crate) fn map_criterion(criterion: Criterion) -> batch_engine::Criterion {
    match criterion {
        Criterion::MissingAlt => batch_engine::Criterion::MissingAlt,
        Criterion::All => batch_engine::Criterion::All,
    }
}

fn map_log(message: batch_engine::LogMessage) -> LogLine {
    let kind = match message.kind {
        batch_engine::LogKind::Success => LogKind::Success,
        batch_engine::LogKind::Error => LogKind::Error,
        batch_engine::LogKind::Notice => LogKind::Notice,
        batch_engine::LogKind::Info => LogKind::Info,
    };
    LogLine::new(kind, message.message)
}

pub(crate) fn kind_tag(kind: LogKind) -> &'static str {
    match kind {
        LogKind::Success => "ok",
        LogKind::Error => "error",
        LogKind::Notice => "notice",
        LogKind::Info => "info",
    }
}
