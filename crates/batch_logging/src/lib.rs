#![deny(missing_docs)]
//! Shared logging utilities for the mediabatch workspace.
//!
//! This crate provides the `batch_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger.

use std::cell::Cell;

thread_local! {
    /// Thread-local storage for the offset of the page currently being
    /// processed by the worker on this thread.
    static PAGE_OFFSET: Cell<u64> = const { Cell::new(0) };
}

/// Sets the page offset for the current thread.
/// The worker calls this once per batch request before processing the page.
pub fn set_page_offset(offset: u64) {
    PAGE_OFFSET.with(|v| v.set(offset));
}

/// Retrieves the page offset for the current thread.
/// Returns 0 if no batch request has been handled on this thread yet.
pub fn get_page_offset() -> u64 {
    PAGE_OFFSET.with(|v| v.get())
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! batch_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! batch_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! batch_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! batch_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! batch_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offset_is_per_thread() {
        set_page_offset(42);
        assert_eq!(get_page_offset(), 42);

        let other = std::thread::spawn(get_page_offset).join().unwrap();
        assert_eq!(other, 0);
    }
}
