use std::sync::Once;

use batch_core::{update, Criterion, Effect, JobState, LogKind, LogLine, Msg, LOG_CAP};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(batch_logging::initialize_for_tests);
}

fn running_job(total: u64) -> JobState {
    let state = JobState::new();
    let (state, _effects) = update(
        state,
        Msg::StartClicked {
            criterion: Criterion::MissingAlt,
        },
    );
    let (state, _effects) = update(state, Msg::TotalReceived { total });
    state
}

#[test]
fn percent_is_clamped_and_rounded() {
    init_logging();
    let state = running_job(40);
    let (state, _effects) = update(state, Msg::BatchDue);
    let (state, _effects) = update(
        state,
        Msg::BatchSucceeded {
            processed_count: 12,
            log: Vec::new(),
        },
    );

    let view = state.view();
    assert_eq!(view.percent, 30);
    assert_eq!(view.progress_label, "12 / 40 (30%)");
}

#[test]
fn percent_never_exceeds_100_even_if_counts_drift() {
    init_logging();
    let state = running_job(3);
    let (state, _effects) = update(state, Msg::BatchDue);
    // Re-running an offset can over-count; the display clamps.
    let (state, _effects) = update(
        state,
        Msg::BatchSucceeded {
            processed_count: 5,
            log: Vec::new(),
        },
    );
    let view = state.view();
    assert_eq!(view.percent, 100);
    assert_eq!(view.progress_label, "3 / 3 (100%)");
}

#[test]
fn log_ring_keeps_only_the_last_100_entries() {
    init_logging();
    let state = running_job(1000);
    let (mut state, _effects) = update(state, Msg::BatchDue);

    let lines: Vec<LogLine> = (0..130)
        .map(|i| LogLine::new(LogKind::Info, format!("line {i}")))
        .collect();
    let (next, _effects) = update(
        state.clone(),
        Msg::BatchSucceeded {
            processed_count: 8,
            log: lines,
        },
    );
    state = next;

    let view = state.view();
    assert_eq!(view.log.len(), LOG_CAP);
    // FIFO eviction: the oldest lines are gone, the newest survive.
    assert_eq!(view.log.last().unwrap().message, "line 129");
    assert!(!view.log.iter().any(|line| line.message == "line 29"));
    assert!(view.log.iter().any(|line| line.message == "line 30"));
}

#[test]
fn clear_log_empties_the_ring() {
    init_logging();
    let state = running_job(10);
    assert!(state.view().log.len() > 0);

    let (state, effects) = update(state, Msg::ClearLogClicked);
    assert!(effects.is_empty());
    assert!(state.view().log.is_empty());
}

#[test]
fn export_emits_the_current_lines_in_order() {
    init_logging();
    let state = running_job(10);
    let expected = state.view().log;

    let (_state, effects) = update(state, Msg::ExportLogClicked);
    assert_eq!(effects, vec![Effect::ExportLog { lines: expected }]);
}

#[test]
fn dirty_flag_is_consumed_once() {
    init_logging();
    let mut state = running_job(10);
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());

    let (mut state, _effects) = update(state.clone(), Msg::Tick);
    // A tick alone does not dirty the view.
    assert!(!state.consume_dirty());
}
