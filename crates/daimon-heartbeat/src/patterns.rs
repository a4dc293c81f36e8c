//! Per-batch pattern detection

use daimon_core::{Event, Patterns};

/// Compute patterns over one batch. Nothing carries over between batches.
///
/// A batch with at least `error_streak_threshold` failed events is flagged
/// with `error_streak = <failures>` and `possible_frustration`.
pub fn detect_patterns(events: &[Event], error_streak_threshold: usize) -> Patterns {
    let failures = events.iter().filter(|e| e.is_failure()).count();
    if failures > 0 && failures >= error_streak_threshold {
        Patterns {
            error_streak: Some(failures),
            possible_frustration: true,
        }
    } else {
        Patterns::default()
    }
}
