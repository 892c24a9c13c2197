use std::sync::{mpsc, Arc};
use std::thread;

use crate::{BatchOutcome, BatchTransport, Criterion, TransportError};

enum TransportCommand {
    Count {
        criterion: Criterion,
    },
    Batch {
        offset: u64,
        batch_size: u32,
        criterion: Criterion,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    CountCompleted {
        result: Result<u64, TransportError>,
    },
    BatchCompleted {
        result: Result<BatchOutcome, TransportError>,
    },
}

/// Runs a [`BatchTransport`] on a dedicated thread with its own tokio
/// runtime. Commands are executed one at a time with `block_on`, which is
/// what guarantees that at most one call is ever in flight and that
/// batches resolve in the order they were issued.
pub struct TransportHandle {
    cmd_tx: mpsc::Sender<TransportCommand>,
    event_rx: mpsc::Receiver<TransportEvent>,
}

/// Cloneable command side of a [`TransportHandle`], for the effect runner.
#[derive(Clone)]
pub struct TransportSender {
    cmd_tx: mpsc::Sender<TransportCommand>,
}

impl TransportHandle {
    pub fn new(transport: Arc<dyn BatchTransport>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<TransportCommand>();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            while let Ok(command) = cmd_rx.recv() {
                let event = runtime.block_on(run_command(transport.as_ref(), command));
                if event_tx.send(event).is_err() {
                    break;
                }
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn sender(&self) -> TransportSender {
        TransportSender {
            cmd_tx: self.cmd_tx.clone(),
        }
    }

    pub fn try_recv(&self) -> Option<TransportEvent> {
        self.event_rx.try_recv().ok()
    }
}

impl TransportSender {
    pub fn request_count(&self, criterion: Criterion) {
        let _ = self.cmd_tx.send(TransportCommand::Count { criterion });
    }

    pub fn request_batch(&self, offset: u64, batch_size: u32, criterion: Criterion) {
        let _ = self.cmd_tx.send(TransportCommand::Batch {
            offset,
            batch_size,
            criterion,
        });
    }
}

async fn run_command(transport: &dyn BatchTransport, command: TransportCommand) -> TransportEvent {
    match command {
        TransportCommand::Count { criterion } => TransportEvent::CountCompleted {
            result: transport.count(criterion).await,
        },
        TransportCommand::Batch {
            offset,
            batch_size,
            criterion,
        } => TransportEvent::BatchCompleted {
            result: transport.process_batch(offset, batch_size, criterion).await,
        },
    }
}
