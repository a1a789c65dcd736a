/// CompletionLog entity: one record per (habit, calendar date)
///
/// This module defines the daily completion row and the mutations the toggle
/// operation can apply to it. The completion percentage is always derived
/// from the count and never authoritative.

use serde::{Deserialize, Serialize};
use chrono::NaiveDate;
use crate::domain::{DomainError, HabitId, HabitKind};

/// A mutation to apply to a day's completion log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOp {
    /// Boolean habits: flip done. Countable habits: add one unit.
    Toggle,
    /// Countable habits: add the given delta (negative undoes, clamped at 0).
    /// Boolean habits treat any increment as a plain toggle.
    Increment(i64),
    /// Idempotent set-state: mark the day done or not done outright.
    SetDone(bool),
}

/// The completion record for one habit on one calendar date
///
/// `(habit_id, log_date)` is the natural key; the store enforces at most one
/// row per pair. `done` and `completion_percentage` are both derived from
/// `current_count` against the habit's target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionLog {
    /// Which habit this log is for
    pub habit_id: HabitId,
    /// Which calendar day this log is for
    pub log_date: NaiveDate,
    /// Whether the day counts as completed
    pub done: bool,
    /// Units logged so far today (0 or 1 for boolean habits)
    pub current_count: u32,
    /// Derived progress indicator in 0..=100
    pub completion_percentage: u8,
    /// Optional user note for the day
    pub notes: Option<String>,
}

impl CompletionLog {
    /// An empty log for a date that has not been acted on yet
    pub fn fresh(habit_id: HabitId, log_date: NaiveDate) -> Self {
        Self {
            habit_id,
            log_date,
            done: false,
            current_count: 0,
            completion_percentage: 0,
            notes: None,
        }
    }

    /// Create a log from existing data (used when loading from the database)
    pub fn from_existing(
        habit_id: HabitId,
        log_date: NaiveDate,
        done: bool,
        current_count: u32,
        completion_percentage: u8,
        notes: Option<String>,
    ) -> Self {
        Self {
            habit_id,
            log_date,
            done,
            current_count,
            completion_percentage,
            notes,
        }
    }

    /// Apply a mutation and rederive `done` and `completion_percentage`
    pub fn apply(&mut self, kind: &HabitKind, op: LogOp) {
        let target = kind.target();

        self.current_count = match (kind, op) {
            // A boolean day is a 1/1 count; toggling flips it regardless of
            // any increment the caller supplied.
            (HabitKind::Boolean, LogOp::Toggle) | (HabitKind::Boolean, LogOp::Increment(_)) => {
                if self.current_count >= 1 { 0 } else { 1 }
            }
            (HabitKind::Boolean, LogOp::SetDone(done)) => {
                if done { 1 } else { 0 }
            }
            (HabitKind::Countable { .. }, LogOp::Toggle) => {
                self.current_count.saturating_add(1)
            }
            (HabitKind::Countable { .. }, LogOp::Increment(delta)) => {
                let next = self.current_count as i64 + delta;
                next.clamp(0, u32::MAX as i64) as u32
            }
            (HabitKind::Countable { .. }, LogOp::SetDone(true)) => {
                self.current_count.max(target)
            }
            (HabitKind::Countable { .. }, LogOp::SetDone(false)) => 0,
        };

        self.completion_percentage = completion_percentage(kind, self.current_count);
        self.done = self.current_count >= target;
    }

    /// Attach or replace the day's note
    pub fn set_notes(&mut self, notes: Option<String>) -> Result<(), DomainError> {
        if let Some(ref text) = notes {
            if text.len() > 500 {
                return Err(DomainError::InvalidValue {
                    message: "Notes cannot be longer than 500 characters".to_string(),
                });
            }
        }
        self.notes = notes;
        Ok(())
    }
}

/// Derive the completion percentage for a count against a habit's target
///
/// `min(100, round(100 * count / target))`, rounding half up.
pub fn completion_percentage(kind: &HabitKind, count: u32) -> u8 {
    let target = kind.target() as u64;
    let scaled = (200 * count as u64 + target) / (2 * target);
    scaled.min(100) as u8
}
