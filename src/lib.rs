/// Habit scheduling and completion-consistency engine
///
/// This library decides which habits are due on a calendar date, records
/// completions under concurrent and duplicate writes, and keeps streak
/// counters in lockstep with the completion log. The presentation, auth, and
/// notification layers live elsewhere and talk to `HabitEngine`.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;

// Internal modules
mod domain;
mod ops;
mod storage;

// Re-export public modules and types
pub use domain::*;
pub use ops::stats::HabitStatistics;
pub use ops::today::TodayEntry;
pub use storage::{HabitStore, SqliteStore, StorageError};

/// Delay before the single internal retry on write contention
const CONFLICT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Errors surfaced by engine operations
///
/// `NotFound` and the invalid-input variants are for user-facing messaging;
/// `Conflict` is returned only after an internal retry; `Inconsistent` means
/// stored streak state disagrees with the log history and is never repaired
/// silently.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Habit not found: {habit_id}")]
    NotFound { habit_id: String },

    #[error("Habit is inactive: {habit_id}")]
    InactiveHabit { habit_id: String },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Domain validation error: {0}")]
    Domain(#[from] DomainError),

    #[error("Concurrent write contention, retry the request")]
    Conflict,

    #[error("Streak state for habit {habit_id} cannot be derived from its log history: {detail}")]
    Inconsistent { habit_id: String, detail: String },

    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::HabitNotFound { habit_id } => EngineError::NotFound { habit_id },
            other => EngineError::Storage(other),
        }
    }
}

/// The engine facade the presentation/session layer calls into
///
/// Every operation takes an explicit `Session` (resolved identity, the
/// caller's current date, and week-start preference); the engine holds no
/// per-user state of its own.
pub struct HabitEngine {
    store: SqliteStore,
}

impl HabitEngine {
    /// Open the engine over a database file, migrating the schema if needed
    pub fn open(db_path: PathBuf) -> Result<Self, EngineError> {
        tracing::info!("Initializing habit engine with database: {:?}", db_path);
        let store = SqliteStore::open(db_path)?;
        Ok(Self { store })
    }

    /// Open the engine over a private in-memory database
    pub fn open_in_memory() -> Result<Self, EngineError> {
        let store = SqliteStore::open_in_memory()?;
        Ok(Self { store })
    }

    /// Get a reference to the storage layer (useful for testing)
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Register a new habit for the session's user
    ///
    /// The creation date is the session's current date; it anchors interval
    /// scheduling and cuts off retroactive due dates.
    pub fn create_habit(
        &self,
        session: &Session,
        name: String,
        kind: HabitKind,
        frequency: Frequency,
    ) -> Result<Habit, EngineError> {
        let habit = Habit::new(
            session.user_id.clone(),
            name,
            kind,
            frequency,
            session.today,
        )?;
        self.store.create_habit(&habit)?;
        Ok(habit)
    }

    /// List the session user's habits
    pub fn list_habits(&self, session: &Session, active_only: bool) -> Result<Vec<Habit>, EngineError> {
        Ok(self.store.list_habits(&session.user_id, active_only)?)
    }

    /// Delete a habit along with its logs and streak state
    pub fn delete_habit(&self, session: &Session, habit_id: &HabitId) -> Result<(), EngineError> {
        ops::fetch_owned(&self.store, session, habit_id)?;
        self.store.delete_habit(habit_id)?;
        Ok(())
    }

    /// Pause or resume a habit
    pub fn set_habit_active(
        &self,
        session: &Session,
        habit_id: &HabitId,
        active: bool,
    ) -> Result<(), EngineError> {
        ops::fetch_owned(&self.store, session, habit_id)?;
        self.store.set_habit_active(habit_id, active)?;
        Ok(())
    }

    /// The habits due for the user on `date`, with logs and streaks attached
    pub fn todays_habits(
        &self,
        session: &Session,
        date: NaiveDate,
    ) -> Result<Vec<TodayEntry>, EngineError> {
        ops::today::todays_habits(&self.store, session, date)
    }

    /// Toggle a habit's completion for a date
    ///
    /// `increment` is ignored for boolean habits and defaults to 1 for
    /// countable ones. Contention is retried once before surfacing Conflict.
    pub fn toggle_habit(
        &self,
        session: &Session,
        habit_id: &HabitId,
        log_date: NaiveDate,
        increment: Option<i64>,
    ) -> Result<CompletionLog, EngineError> {
        retry_on_contention(|| {
            ops::toggle::toggle_habit(&self.store, session, habit_id, log_date, increment)
        })
    }

    /// Idempotently set a date's completion state (see `ops::toggle`)
    pub fn set_completion(
        &self,
        session: &Session,
        habit_id: &HabitId,
        log_date: NaiveDate,
        done: bool,
    ) -> Result<CompletionLog, EngineError> {
        retry_on_contention(|| {
            ops::toggle::set_completion(&self.store, session, habit_id, log_date, done)
        })
    }

    /// Aggregate completion statistics for a habit
    pub fn habit_statistics(
        &self,
        session: &Session,
        habit_id: &HabitId,
    ) -> Result<HabitStatistics, EngineError> {
        ops::stats::habit_statistics(&self.store, session, habit_id)
    }

    /// Check that stored streak state matches a replay of the log history
    ///
    /// Returns `Inconsistent` on mismatch. Nothing is repaired: a mismatch is
    /// a data-integrity bug that must be surfaced, not papered over.
    pub fn verify_streak(&self, session: &Session, habit_id: &HabitId) -> Result<(), EngineError> {
        let habit = ops::fetch_owned(&self.store, session, habit_id)?;

        let stored = self.store.get_streak(&habit.id)?;
        let dates = self.store.completed_dates(&habit.id)?;
        let rebuilt = StreakState::rebuild(habit.id.clone(), &dates);

        if stored != rebuilt {
            tracing::error!(
                "Streak state for habit {} diverged from its log history: stored {:?}, rebuilt {:?}",
                habit.id,
                stored,
                rebuilt
            );
            return Err(EngineError::Inconsistent {
                habit_id: habit.id.to_string(),
                detail: format!(
                    "stored streak {}/{} vs replayed {}/{}",
                    stored.current_streak,
                    stored.longest_streak,
                    rebuilt.current_streak,
                    rebuilt.longest_streak
                ),
            });
        }

        Ok(())
    }
}

/// Run a write, retrying once with backoff if the store reports contention
fn retry_on_contention<T>(
    mut operation: impl FnMut() -> Result<T, EngineError>,
) -> Result<T, EngineError> {
    match operation() {
        Err(EngineError::Storage(err)) if err.is_contention() => {
            tracing::warn!("Write contention, retrying once: {}", err);
            std::thread::sleep(CONFLICT_RETRY_DELAY);
            operation().map_err(|retry_err| match retry_err {
                EngineError::Storage(err) if err.is_contention() => EngineError::Conflict,
                other => other,
            })
        }
        result => result,
    }
}
