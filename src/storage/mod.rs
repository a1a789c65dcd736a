/// Storage layer for persisting habit data
///
/// This module handles all database operations using SQLite. It provides
/// a clean interface for storing and retrieving habits, completion logs, and
/// streak state, with the toggle path running as a single transaction.

pub mod sqlite;
pub mod migrations;

// Re-export the main storage types
pub use sqlite::*;

use thiserror::Error;
use chrono::NaiveDate;
use crate::domain::{CompletionLog, Habit, HabitId, LogOp, StreakState, UserId};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Habit not found: {habit_id}")]
    HabitNotFound { habit_id: String },

    #[error("Migration error: {0}")]
    Migration(String),
}

impl StorageError {
    /// Whether this error is write contention worth a retry
    pub fn is_contention(&self) -> bool {
        match self {
            StorageError::Query(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

/// Trait defining the storage interface for the engine
///
/// This trait is the seam between the engine operations and SQLite; tests
/// and future backends implement the same surface.
pub trait HabitStore {
    /// Create a new habit
    fn create_habit(&self, habit: &Habit) -> Result<(), StorageError>;

    /// Get a habit by ID
    fn get_habit(&self, habit_id: &HabitId) -> Result<Habit, StorageError>;

    /// List habits belonging to a user
    fn list_habits(&self, user_id: &UserId, active_only: bool) -> Result<Vec<Habit>, StorageError>;

    /// Delete a habit; its logs and streak state cascade away with it
    fn delete_habit(&self, habit_id: &HabitId) -> Result<(), StorageError>;

    /// Pause or resume a habit
    fn set_habit_active(&self, habit_id: &HabitId, active: bool) -> Result<(), StorageError>;

    /// Get the completion log for one habit/date, if the date was acted on
    fn get_log(
        &self,
        habit_id: &HabitId,
        log_date: NaiveDate,
    ) -> Result<Option<CompletionLog>, StorageError>;

    /// All distinct dates currently marked done for a habit, ascending
    fn completed_dates(&self, habit_id: &HabitId) -> Result<Vec<NaiveDate>, StorageError>;

    /// Apply a log mutation and the matching streak transition atomically
    ///
    /// The read-modify-write of the log row and the streak row commit as one
    /// unit; concurrent calls for the same key serialize.
    fn toggle_log(
        &self,
        habit: &Habit,
        log_date: NaiveDate,
        op: LogOp,
    ) -> Result<(CompletionLog, StreakState), StorageError>;

    /// Get streak state for a habit (the Broken state if never completed)
    fn get_streak(&self, habit_id: &HabitId) -> Result<StreakState, StorageError>;

    /// Count (total, completed) log rows for a habit
    fn log_counts(&self, habit_id: &HabitId) -> Result<(u32, u32), StorageError>;
}
