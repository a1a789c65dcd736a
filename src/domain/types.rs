/// Core types and enums used throughout the domain layer
///
/// This module defines the fundamental identifier, frequency, and session
/// types used by Habit, CompletionLog, and StreakState.

use serde::{Deserialize, Serialize};
use chrono::{Datelike, FixedOffset, NaiveDate, Utc, Weekday};
use uuid::Uuid;

use crate::domain::DomainError;

/// Unique identifier for a habit
///
/// This is a wrapper around UUID to provide type safety - you can't accidentally
/// pass a habit ID where a user ID is expected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HabitId(pub Uuid);

impl HabitId {
    /// Generate a new random habit ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a habit ID from a string (useful for database loading)
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl std::fmt::Display for HabitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for the user owning a habit
///
/// The engine never resolves users itself; it only checks ownership of the
/// habits it is asked to operate on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a user ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Whether a habit is a simple yes/no or a counted-progress habit
///
/// Countable habits carry their daily target, so a countable habit without a
/// target count is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HabitKind {
    /// Done or not done for the day
    Boolean,
    /// Done once `target_count` units have been logged for the day
    Countable { target_count: u32 },
}

impl HabitKind {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let HabitKind::Countable { target_count } = self {
            if *target_count == 0 {
                return Err(DomainError::InvalidValue {
                    message: "Target count must be at least 1".to_string(),
                });
            }
            if *target_count > 10000 {
                return Err(DomainError::InvalidValue {
                    message: "Target count cannot exceed 10000".to_string(),
                });
            }
        }
        Ok(())
    }

    /// The count that marks a day complete (boolean habits are 1/1 counts)
    pub fn target(&self) -> u32 {
        match self {
            HabitKind::Boolean => 1,
            HabitKind::Countable { target_count } => *target_count,
        }
    }
}

/// How often a habit should be performed
///
/// The frequency decides which calendar dates a habit is due on. Each variant
/// carries exactly the parameters it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    /// Every single day
    Daily,
    /// Specific days of the week (e.g., Monday, Wednesday, Friday)
    WeeklyDays(Vec<Weekday>),
    /// Every N days, counted from the habit's creation date
    Interval(u32),
}

impl Frequency {
    /// Validate that a frequency value is reasonable
    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            Frequency::WeeklyDays(days) => {
                if days.is_empty() {
                    return Err(DomainError::InvalidFrequency(
                        "Weekly frequency must specify at least one day".to_string()
                    ));
                }
                if days.len() > 7 {
                    return Err(DomainError::InvalidFrequency(
                        "Weekly frequency cannot have more than 7 days".to_string()
                    ));
                }
                let mut seen = days.clone();
                seen.sort_by_key(|d| d.num_days_from_monday());
                seen.dedup();
                if seen.len() != days.len() {
                    return Err(DomainError::InvalidFrequency(
                        "Weekly frequency cannot repeat a day".to_string()
                    ));
                }
            }
            Frequency::Interval(days) => {
                if *days == 0 {
                    return Err(DomainError::InvalidFrequency(
                        "Interval must be at least 1 day".to_string()
                    ));
                }
                if *days > 365 {
                    return Err(DomainError::InvalidFrequency(
                        "Interval cannot be longer than 365 days".to_string()
                    ));
                }
            }
            Frequency::Daily => {}
        }
        Ok(())
    }

    /// Check whether this frequency schedules the habit for `date`
    ///
    /// `anchor` is the habit's creation date; interval frequencies count whole
    /// days from it. Dates before the anchor are never scheduled.
    pub fn is_scheduled_for(&self, date: NaiveDate, anchor: NaiveDate) -> bool {
        match self {
            Frequency::Daily => true,
            Frequency::WeeklyDays(days) => days.contains(&date.weekday()),
            Frequency::Interval(interval) => {
                let elapsed = (date - anchor).num_days();
                elapsed >= 0 && elapsed % (*interval as i64) == 0
            }
        }
    }
}

/// The user's first-day-of-week preference
///
/// Callers supply weekly schedules as day indexes 0..=6 relative to their
/// preferred week start; this type decodes them into calendar weekdays at the
/// input boundary. Stored habits always carry absolute weekdays, so a later
/// preference change never reinterprets an existing schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeekStart {
    Sunday,
    Monday,
}

impl WeekStart {
    /// Decode a week-start-relative day index (0 = first day of the week)
    pub fn weekday_from_index(&self, index: u8) -> Result<Weekday, DomainError> {
        if index > 6 {
            return Err(DomainError::InvalidFrequency(
                format!("Day index must be 0-6, got {}", index)
            ));
        }
        let days = match self {
            WeekStart::Sunday => [
                Weekday::Sun, Weekday::Mon, Weekday::Tue, Weekday::Wed,
                Weekday::Thu, Weekday::Fri, Weekday::Sat,
            ],
            WeekStart::Monday => [
                Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu,
                Weekday::Fri, Weekday::Sat, Weekday::Sun,
            ],
        };
        Ok(days[index as usize])
    }

    /// Decode a full set of day indexes into weekdays
    pub fn weekdays_from_indexes(&self, indexes: &[u8]) -> Result<Vec<Weekday>, DomainError> {
        indexes.iter().map(|i| self.weekday_from_index(*i)).collect()
    }
}

impl std::str::FromStr for WeekStart {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sunday" | "sun" => Ok(WeekStart::Sunday),
            "monday" | "mon" => Ok(WeekStart::Monday),
            other => Err(DomainError::InvalidValue {
                message: format!("Unknown week start '{}', expected sunday or monday", other),
            }),
        }
    }
}

/// Resolved caller identity and calendar context for one engine call
///
/// The original client kept this in a global auth/preferences store; here it
/// is an explicit value passed into every operation. `today` is the current
/// date in the caller's timezone and is the reference point for rejecting
/// future-dated writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub today: NaiveDate,
    pub week_start: WeekStart,
}

impl Session {
    /// Resolve a session from the caller's timezone offset
    pub fn resolve(user_id: UserId, timezone: FixedOffset, week_start: WeekStart) -> Self {
        let today = Utc::now().with_timezone(&timezone).date_naive();
        Self { user_id, today, week_start }
    }

    /// Build a session with an explicit "today" (tests, replays)
    pub fn on_date(user_id: UserId, today: NaiveDate, week_start: WeekStart) -> Self {
        Self { user_id, today, week_start }
    }
}
