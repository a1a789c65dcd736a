/// The engine's externally-exposed operations
///
/// Each submodule implements one logical operation from the public contract
/// (today view, toggle/set-state, statistics), generic over the storage
/// trait. Ownership and session validation happen here, before any write.

pub mod stats;
pub mod today;
pub mod toggle;

use crate::domain::{Habit, HabitId, Session};
use crate::storage::{HabitStore, StorageError};
use crate::EngineError;

/// Fetch a habit and verify the session owns it
///
/// A habit owned by someone else is reported as NotFound, indistinguishable
/// from a habit that does not exist.
pub(crate) fn fetch_owned<S: HabitStore>(
    store: &S,
    session: &Session,
    habit_id: &HabitId,
) -> Result<Habit, EngineError> {
    let habit = match store.get_habit(habit_id) {
        Ok(habit) => habit,
        Err(StorageError::HabitNotFound { habit_id }) => {
            return Err(EngineError::NotFound { habit_id })
        }
        Err(e) => return Err(e.into()),
    };

    if habit.user_id != session.user_id {
        return Err(EngineError::NotFound {
            habit_id: habit_id.to_string(),
        });
    }

    Ok(habit)
}
