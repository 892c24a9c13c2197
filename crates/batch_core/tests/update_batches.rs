use std::sync::Once;

use batch_core::{
    initial_batch_size, update, Criterion, Effect, JobState, LogKind, LogLine, Msg, Phase,
    FIRST_BATCH_DELAY, INTER_BATCH_DELAY, RETRY_DELAY,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(batch_logging::initialize_for_tests);
}

/// Drives a fresh job through start and count so it is ready for its
/// first `BatchDue`.
fn running_job(total: u64) -> JobState {
    let state = JobState::new();
    let (state, _effects) = update(
        state,
        Msg::StartClicked {
            criterion: Criterion::MissingAlt,
        },
    );
    let (state, effects) = update(state, Msg::TotalReceived { total });
    assert_eq!(
        effects,
        vec![Effect::ScheduleBatch {
            delay: FIRST_BATCH_DELAY
        }]
    );
    state
}

/// Fires `BatchDue` and returns the requested (offset, batch_size), or
/// `None` if no batch request was issued.
fn fire_due(state: JobState) -> (JobState, Option<(u64, u32)>) {
    let (state, effects) = update(state, Msg::BatchDue);
    match effects.as_slice() {
        [Effect::RequestBatch {
            offset, batch_size, ..
        }] => {
            let requested = (*offset, *batch_size);
            (state, Some(requested))
        }
        [] => (state, None),
        other => panic!("unexpected effects from BatchDue: {other:?}"),
    }
}

fn succeed(state: JobState, processed_count: u64) -> (JobState, Vec<Effect>) {
    update(
        state,
        Msg::BatchSucceeded {
            processed_count,
            log: Vec::new(),
        },
    )
}

#[test]
fn batch_size_tiers_match_the_contract() {
    assert_eq!(initial_batch_size(1), 2);
    assert_eq!(initial_batch_size(10), 2);
    assert_eq!(initial_batch_size(11), 3);
    assert_eq!(initial_batch_size(50), 3);
    assert_eq!(initial_batch_size(51), 5);
    assert_eq!(initial_batch_size(200), 5);
    assert_eq!(initial_batch_size(201), 8);
    assert_eq!(initial_batch_size(1000), 8);
}

#[test]
fn batch_size_is_monotonic_and_at_least_one() {
    let mut previous = 0;
    for total in 0..=1024 {
        let size = initial_batch_size(total);
        assert!(size >= 1);
        assert!(size >= previous, "tier shrank at total={total}");
        previous = size;
    }
}

#[test]
fn seven_images_in_pages_of_two_requests_offsets_0_2_4_6() {
    init_logging();
    let mut state = running_job(7);
    let mut requested = Vec::new();

    loop {
        let (next, page) = fire_due(state);
        let Some((offset, batch_size)) = page else {
            panic!("job stalled before completion");
        };
        requested.push(offset);
        assert_eq!(batch_size, 2);

        // The backing set has 7 images, so the last page is short.
        let remaining = 7u64.saturating_sub(offset);
        let (next, effects) = succeed(next, remaining.min(2));
        state = next;
        if state.phase() == Phase::Completed {
            assert!(effects.is_empty());
            break;
        }
        assert_eq!(
            effects,
            vec![Effect::ScheduleBatch {
                delay: INTER_BATCH_DELAY
            }]
        );
    }

    assert_eq!(requested, vec![0, 2, 4, 6]);
    assert_eq!(state.processed(), 7);
}

#[test]
fn short_last_page_still_advances_by_full_width() {
    init_logging();
    let state = running_job(3);
    let (state, page) = fire_due(state);
    assert_eq!(page, Some((0, 2)));
    let (state, _effects) = succeed(state, 2);
    assert_eq!(state.offset(), 2);

    let (state, page) = fire_due(state);
    assert_eq!(page, Some((2, 2)));
    // Only one image was left on this page.
    let (state, _effects) = succeed(state, 1);

    // The cursor still moved the full page width.
    assert_eq!(state.offset(), 4);
    assert_eq!(state.processed(), 3);
    assert_eq!(state.phase(), Phase::Completed);
}

#[test]
fn zero_progress_batch_completes_the_job() {
    init_logging();
    let state = running_job(10);
    let (state, _page) = fire_due(state);
    let (state, _effects) = succeed(state, 2);
    assert_eq!(state.phase(), Phase::Processing);

    let (state, _page) = fire_due(state);
    let (state, effects) = succeed(state, 0);
    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Completed);
    assert_eq!(state.processed(), 2);
}

#[test]
fn two_timeouts_halve_the_batch_without_moving_the_cursor() {
    init_logging();
    let state = running_job(1000);
    let (state, page) = fire_due(state);
    assert_eq!(page, Some((0, 8)));

    let (state, effects) = update(state, Msg::BatchTimedOut);
    assert_eq!(effects, vec![Effect::ScheduleBatch { delay: RETRY_DELAY }]);
    assert_eq!(state.phase(), Phase::RetryWait);
    let (state, page) = fire_due(state);
    assert_eq!(page, Some((0, 4)));

    let (state, _effects) = update(state, Msg::BatchTimedOut);
    let (state, page) = fire_due(state);
    assert_eq!(page, Some((0, 2)));

    // The third attempt succeeds and the cursor finally advances by the
    // shrunk width.
    let (state, _effects) = succeed(state, 2);
    assert_eq!(state.offset(), 2);
    assert_eq!(state.processed(), 2);
}

#[test]
fn batch_size_shrinks_no_further_than_one() {
    init_logging();
    let mut state = running_job(7);
    let (next, _page) = fire_due(state);
    state = next;
    for _ in 0..4 {
        let (next, _effects) = update(state, Msg::BatchTimedOut);
        let (next, page) = fire_due(next);
        assert!(page.is_some());
        state = next;
    }
    assert_eq!(state.batch_size(), 1);
}

#[test]
fn transport_failure_is_terminal_and_preserves_counts() {
    init_logging();
    let state = running_job(10);
    let (state, _page) = fire_due(state);
    let (state, _effects) = succeed(state, 2);
    let (state, _page) = fire_due(state);

    let (state, effects) = update(
        state,
        Msg::BatchFailed {
            message: "http status 500".into(),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Error);
    assert_eq!(state.processed(), 2);
    assert!(state
        .log_lines()
        .any(|line| line.kind == LogKind::Error && line.message.contains("http status 500")));
}

#[test]
fn stop_mid_batch_merges_results_then_stops_at_next_decision() {
    init_logging();
    let state = running_job(10);
    let (state, _page) = fire_due(state);

    // Operator confirms a stop while the batch is in flight.
    let (state, _effects) = update(state, Msg::StopConfirmed);

    // The in-flight batch resolves; its results are still recorded.
    let (state, effects) = update(
        state,
        Msg::BatchSucceeded {
            processed_count: 2,
            log: vec![LogLine::new(LogKind::Success, "ID 7: compressed")],
        },
    );
    assert_eq!(state.processed(), 2);
    assert!(state
        .log_lines()
        .any(|line| line.message.contains("ID 7: compressed")));
    assert_eq!(
        effects,
        vec![Effect::ScheduleBatch {
            delay: INTER_BATCH_DELAY
        }]
    );

    // The next scheduling decision suppresses the call and finishes.
    let (state, effects) = update(state, Msg::BatchDue);
    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Stopped);
    assert!(state.view().start_enabled);
}

#[test]
fn completion_outranks_a_pending_stop() {
    init_logging();
    let state = running_job(4);
    let (state, _page) = fire_due(state);
    let (state, _effects) = succeed(state, 2);
    let (state, _page) = fire_due(state);

    // Operator asks to stop while the final batch is in flight.
    let (state, _effects) = update(state, Msg::StopConfirmed);
    let (state, effects) = succeed(state, 2);

    // The batch finished the job, so it completes rather than stops.
    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Completed);
    assert_eq!(state.processed(), 4);
}
