/// Habit statistics aggregation
///
/// Read-only summary derived by scanning the log and streak records.

use serde::Serialize;

use crate::domain::{HabitId, Session};
use crate::ops::fetch_owned;
use crate::storage::HabitStore;
use crate::EngineError;

/// Aggregated statistics for one habit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitStatistics {
    pub habit_id: String,
    /// Completed log rows over total log rows, 0.0 when nothing was logged
    pub completion_rate: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_logs: u32,
}

/// Compute statistics for a habit the session owns
pub fn habit_statistics<S: HabitStore>(
    store: &S,
    session: &Session,
    habit_id: &HabitId,
) -> Result<HabitStatistics, EngineError> {
    let habit = fetch_owned(store, session, habit_id)?;

    let (total_logs, completed_logs) = store.log_counts(&habit.id)?;
    let streak = store.get_streak(&habit.id)?;

    let completion_rate = if total_logs == 0 {
        0.0
    } else {
        completed_logs as f64 / total_logs as f64
    };

    Ok(HabitStatistics {
        habit_id: habit.id.to_string(),
        completion_rate,
        current_streak: streak.current_streak,
        longest_streak: streak.longest_streak,
        total_logs,
    })
}
