/// Today view assembly
///
/// Joins the habit registry, the due-date evaluator, the date's completion
/// logs, and streak state into the read model the presentation layer shows
/// as "today's habits". Read-only; reflects last-committed state.

use serde::Serialize;
use chrono::NaiveDate;

use crate::domain::{CompletionLog, Habit, Session, StreakState};
use crate::storage::HabitStore;
use crate::EngineError;

/// One due habit with its completion state for the requested date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TodayEntry {
    pub habit: Habit,
    /// Absent when the habit has not been acted on for this date yet
    pub log: Option<CompletionLog>,
    pub streak: StreakState,
}

/// Assemble the due habits for a user on a given date
///
/// Active habits are filtered through the pure due-date check, left-joined
/// with the date's log row, and annotated with their streak counters. The
/// order is stable: creation date ascending, habit id as tie-break (the
/// store's listing order).
pub fn todays_habits<S: HabitStore>(
    store: &S,
    session: &Session,
    date: NaiveDate,
) -> Result<Vec<TodayEntry>, EngineError> {
    let habits = store.list_habits(&session.user_id, true)?;

    let mut entries = Vec::new();
    for habit in habits {
        if !habit.is_due(date) {
            continue;
        }

        let log = store.get_log(&habit.id, date)?;
        let streak = store.get_streak(&habit.id)?;
        entries.push(TodayEntry { habit, log, streak });
    }

    tracing::debug!(
        "Assembled {} due habit(s) for user {} on {}",
        entries.len(),
        session.user_id,
        date
    );
    Ok(entries)
}
