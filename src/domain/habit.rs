/// Habit entity and due-date evaluation
///
/// This module defines the core Habit struct that represents something a user
/// wants to do regularly, along with validation and the pure due-date check.

use serde::{Deserialize, Serialize};
use chrono::NaiveDate;
use crate::domain::{DomainError, Frequency, HabitId, HabitKind, UserId};

/// A habit the user wants to perform on a recurring schedule
///
/// This is the core entity of the engine: the scheduling rule (frequency),
/// the completion shape (kind), and the creation date that anchors interval
/// counting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    /// Unique identifier for this habit
    pub id: HabitId,
    /// The user who owns this habit
    pub user_id: UserId,
    /// Display name (e.g., "Morning Run", "Read 20 pages")
    pub name: String,
    /// Yes/no habit or counted habit with a daily target
    pub kind: HabitKind,
    /// Which calendar dates this habit is due on
    pub frequency: Frequency,
    /// Creation date; anchors interval counting and cuts off retroactive scheduling
    pub created_at: NaiveDate,
    /// Whether this habit is currently active (can be paused)
    pub is_active: bool,
}

impl Habit {
    /// Create a new habit with validation
    pub fn new(
        user_id: UserId,
        name: String,
        kind: HabitKind,
        frequency: Frequency,
        created_at: NaiveDate,
    ) -> Result<Self, DomainError> {
        Self::validate_name(&name)?;
        kind.validate()?;
        frequency.validate()?;

        Ok(Self {
            id: HabitId::new(),
            user_id,
            name,
            kind,
            frequency,
            created_at,
            is_active: true,
        })
    }

    /// Create a habit from existing data (used when loading from the database)
    ///
    /// Assumes the data was validated when first stored.
    #[allow(clippy::too_many_arguments)]
    pub fn from_existing(
        id: HabitId,
        user_id: UserId,
        name: String,
        kind: HabitKind,
        frequency: Frequency,
        created_at: NaiveDate,
        is_active: bool,
    ) -> Self {
        Self {
            id,
            user_id,
            name,
            kind,
            frequency,
            created_at,
            is_active,
        }
    }

    /// Decide whether this habit is due on `date`
    ///
    /// Pure and deterministic. An inactive habit is never due, and no habit
    /// is due before its creation date (no retroactive scheduling).
    pub fn is_due(&self, date: NaiveDate) -> bool {
        if !self.is_active || date < self.created_at {
            return false;
        }
        self.frequency.is_scheduled_for(date, self.created_at)
    }

    /// Validate habit name according to business rules
    fn validate_name(name: &str) -> Result<(), DomainError> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(DomainError::InvalidHabitName(
                "Habit name cannot be empty".to_string()
            ));
        }

        if trimmed.len() > 100 {
            return Err(DomainError::InvalidHabitName(
                "Habit name cannot be longer than 100 characters".to_string()
            ));
        }

        Ok(())
    }
}
