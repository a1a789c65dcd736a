/// The toggle write path
///
/// Validates the caller's request (ownership, active flag, no future dates)
/// and hands the mutation to the store, which applies the log change and the
/// streak transition as one atomic unit.

use chrono::NaiveDate;

use crate::domain::{CompletionLog, HabitId, LogOp, Session};
use crate::ops::fetch_owned;
use crate::storage::HabitStore;
use crate::EngineError;

/// Toggle a habit's completion log for a date
///
/// Boolean habits flip `done`; countable habits add `increment` (default 1,
/// negative to undo, clamped at zero). The matching streak update commits in
/// the same transaction.
pub fn toggle_habit<S: HabitStore>(
    store: &S,
    session: &Session,
    habit_id: &HabitId,
    log_date: NaiveDate,
    increment: Option<i64>,
) -> Result<CompletionLog, EngineError> {
    let op = match increment {
        Some(delta) => LogOp::Increment(delta),
        None => LogOp::Toggle,
    };
    apply(store, session, habit_id, log_date, op)
}

/// Idempotently set a date's completion state
///
/// The retry-safe alternative to `toggle_habit` for boolean habits: repeating
/// the call cannot double-flip. For countable habits, marking done raises the
/// count to the target and marking not-done resets it.
pub fn set_completion<S: HabitStore>(
    store: &S,
    session: &Session,
    habit_id: &HabitId,
    log_date: NaiveDate,
    done: bool,
) -> Result<CompletionLog, EngineError> {
    apply(store, session, habit_id, log_date, LogOp::SetDone(done))
}

fn apply<S: HabitStore>(
    store: &S,
    session: &Session,
    habit_id: &HabitId,
    log_date: NaiveDate,
    op: LogOp,
) -> Result<CompletionLog, EngineError> {
    let habit = fetch_owned(store, session, habit_id)?;

    if !habit.is_active {
        return Err(EngineError::InactiveHabit {
            habit_id: habit_id.to_string(),
        });
    }

    if log_date > session.today {
        return Err(EngineError::InvalidDate(format!(
            "Cannot log {} ahead of the caller's current date {}",
            log_date, session.today
        )));
    }

    let (log, streak) = store.toggle_log(&habit, log_date, op)?;

    tracing::debug!(
        "Habit {} on {}: {}% complete, current streak {}",
        habit.id,
        log_date,
        log.completion_percentage,
        streak.current_streak
    );
    Ok(log)
}
