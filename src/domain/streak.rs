/// Streak state and its transition function
///
/// This module defines the per-habit StreakState row and the transitions that
/// keep it in lockstep with the completion log. The stored state is a cache:
/// replaying the completed dates in order through `record_completion` must
/// reproduce it, so nothing here may invent information the log lacks.

use serde::{Deserialize, Serialize};
use chrono::{Duration, NaiveDate};
use crate::domain::HabitId;

/// Cached streak counters for a habit (one row per habit)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    /// Which habit this streak data is for
    pub habit_id: HabitId,
    /// Length of the current unbroken run of consecutive completed days
    pub current_streak: u32,
    /// Best streak ever achieved for this habit (always >= current_streak)
    pub longest_streak: u32,
    /// Most recent date marked done (None if never completed)
    pub last_completed: Option<NaiveDate>,
    /// First date of the current run (None while the streak is broken)
    pub streak_start: Option<NaiveDate>,
    /// Number of distinct dates currently marked done
    pub total_completions: u32,
}

impl StreakState {
    /// The initial Broken state for a habit with no completions
    pub fn new(habit_id: HabitId) -> Self {
        Self {
            habit_id,
            current_streak: 0,
            longest_streak: 0,
            last_completed: None,
            streak_start: None,
            total_completions: 0,
        }
    }

    /// Create streak state from existing data (used when loading from the database)
    pub fn from_existing(
        habit_id: HabitId,
        current_streak: u32,
        longest_streak: u32,
        last_completed: Option<NaiveDate>,
        streak_start: Option<NaiveDate>,
        total_completions: u32,
    ) -> Self {
        Self {
            habit_id,
            current_streak,
            longest_streak,
            last_completed,
            streak_start,
            total_completions,
        }
    }

    /// Record that `log_date` transitioned to done
    ///
    /// Transition rules:
    /// - same date as the last completion: no change (idempotent on the date)
    /// - the day after the last completion (or first completion ever): the
    ///   run extends by one
    /// - any later date (a forward gap): a new run of length 1 starts at
    ///   `log_date`
    ///
    /// Callers must only invoke this when `done` actually changed to true for
    /// the date, and never for a date earlier than `last_completed`:
    /// backfilling an older date can merge two runs, which needs the full
    /// history and goes through `rebuild` instead.
    pub fn record_completion(&mut self, log_date: NaiveDate) {
        match self.last_completed {
            Some(last) if log_date == last => return,
            Some(last) if log_date == last + Duration::days(1) => {
                self.current_streak += 1;
            }
            _ => {
                self.current_streak = 1;
                self.streak_start = Some(log_date);
            }
        }

        if self.streak_start.is_none() {
            self.streak_start = Some(log_date);
        }
        self.longest_streak = self.longest_streak.max(self.current_streak);
        self.last_completed = Some(log_date);
        self.total_completions += 1;
    }

    /// Record that a date other than the latest completion was undone
    ///
    /// Policy: un-completing an old, already-superseded date does not
    /// retroactively break the current streak; only the completion total
    /// changes. Undoing the *latest* completion goes through `rebuild`
    /// instead, which needs the full history.
    pub fn uncount_completion(&mut self) {
        self.total_completions = self.total_completions.saturating_sub(1);
    }

    /// Reconstruct the state by replaying completed dates from Broken
    ///
    /// `completed_dates` are the distinct dates currently marked done, in any
    /// order. This is the canonical derivation: it restores every field,
    /// including `longest_streak`, which a simple backward walk from the last
    /// pointer could not.
    pub fn rebuild(habit_id: HabitId, completed_dates: &[NaiveDate]) -> Self {
        let mut dates: Vec<NaiveDate> = completed_dates.to_vec();
        dates.sort();
        dates.dedup();

        let mut state = Self::new(habit_id);
        for date in dates {
            state.record_completion(date);
        }
        state
    }

    /// Whether the streak is currently broken
    pub fn is_broken(&self) -> bool {
        self.current_streak == 0
    }
}
