//! Batch core: pure controller state machine and view-model helpers.
//!
//! The controller never performs IO. It consumes [`Msg`] values, mutates
//! [`JobState`], and emits [`Effect`] values for the platform layer to run.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use state::{Criterion, JobState, LogKind, LogLine, Phase, LOG_CAP};
pub use update::{
    initial_batch_size, update, FIRST_BATCH_DELAY, INTER_BATCH_DELAY, RETRY_DELAY,
};
pub use view_model::BulkViewModel;
