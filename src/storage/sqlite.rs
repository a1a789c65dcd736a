/// SQLite implementation of the habit storage interface
///
/// This module provides the concrete SQLite implementation for storing
/// and retrieving habit data. The connection sits behind a mutex so the
/// toggle path is a serialized read-modify-write: the log upsert and the
/// streak update commit in one IMMEDIATE transaction or not at all.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use chrono::{NaiveDate, Utc, Weekday};

use crate::domain::{
    CompletionLog, Frequency, Habit, HabitId, HabitKind, LogOp, StreakState, UserId,
};
use crate::storage::{migrations, HabitStore, StorageError};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-based storage implementation
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file and run migrations
    pub fn open(db_path: PathBuf) -> Result<Self, StorageError> {
        let conn = Connection::open(&db_path)
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;
        Self::init(conn, Some(&db_path))
    }

    /// Open a private in-memory database (tests, scratch sessions)
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<&PathBuf>) -> Result<Self, StorageError> {
        // Cascade deletes from habits to logs and streaks rely on this
        conn.execute("PRAGMA foreign_keys = ON", [])
            .map_err(|e| StorageError::Connection(format!("Failed to enable foreign keys: {}", e)))?;

        migrations::initialize_database(&conn)?;

        match path {
            Some(p) => tracing::info!("SQLite storage initialized at: {:?}", p),
            None => tracing::info!("SQLite storage initialized in memory"),
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Connection("Storage mutex poisoned".to_string()))
    }
}

// Column encoding helpers. Weekdays are stored as 0..=6 from Monday so the
// persisted form never depends on a user's week-start preference.

fn kind_to_columns(kind: &HabitKind) -> (&'static str, Option<u32>) {
    match kind {
        HabitKind::Boolean => ("boolean", None),
        HabitKind::Countable { target_count } => ("countable", Some(*target_count)),
    }
}

fn kind_from_columns(habit_type: &str, target_count: Option<u32>) -> Option<HabitKind> {
    match habit_type {
        "boolean" => Some(HabitKind::Boolean),
        "countable" => Some(HabitKind::Countable {
            target_count: target_count?,
        }),
        _ => None,
    }
}

fn frequency_to_columns(
    frequency: &Frequency,
) -> Result<(&'static str, Option<String>, Option<u32>), StorageError> {
    Ok(match frequency {
        Frequency::Daily => ("daily", None, None),
        Frequency::WeeklyDays(days) => {
            let indexes: Vec<u8> = days.iter().map(|d| d.num_days_from_monday() as u8).collect();
            ("weekly_days", Some(serde_json::to_string(&indexes)?), None)
        }
        Frequency::Interval(interval) => ("interval", None, Some(*interval)),
    })
}

fn weekday_from_monday_index(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

fn frequency_from_columns(
    frequency_type: &str,
    frequency_days: Option<String>,
    interval_days: Option<u32>,
) -> Option<Frequency> {
    match frequency_type {
        "daily" => Some(Frequency::Daily),
        "weekly_days" => {
            let indexes: Vec<u8> = serde_json::from_str(&frequency_days?).ok()?;
            let days: Option<Vec<Weekday>> =
                indexes.into_iter().map(weekday_from_monday_index).collect();
            Some(Frequency::WeeklyDays(days?))
        }
        "interval" => Some(Frequency::Interval(interval_days?)),
        _ => None,
    }
}

fn invalid_column(index: usize, what: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(index, what.to_string(), rusqlite::types::Type::Text)
}

/// Map a `habits` row in SELECT column order into a Habit
fn habit_from_row(row: &rusqlite::Row<'_>) -> Result<Habit, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let id = HabitId::from_string(&id_str).map_err(|_| invalid_column(0, "Invalid UUID"))?;

    let user_id_str: String = row.get(1)?;
    let user_id =
        UserId::from_string(&user_id_str).map_err(|_| invalid_column(1, "Invalid UUID"))?;

    let habit_type: String = row.get(3)?;
    let target_count: Option<u32> = row.get(4)?;
    let kind = kind_from_columns(&habit_type, target_count)
        .ok_or_else(|| invalid_column(3, "Invalid habit type"))?;

    let frequency_type: String = row.get(5)?;
    let frequency_days: Option<String> = row.get(6)?;
    let interval_days: Option<u32> = row.get(7)?;
    let frequency = frequency_from_columns(&frequency_type, frequency_days, interval_days)
        .ok_or_else(|| invalid_column(5, "Invalid frequency"))?;

    let created_at_str: String = row.get(8)?;
    let created_at = NaiveDate::parse_from_str(&created_at_str, DATE_FORMAT)
        .map_err(|_| invalid_column(8, "Invalid date"))?;

    Ok(Habit::from_existing(
        id,
        user_id,
        row.get(2)?, // name
        kind,
        frequency,
        created_at,
        row.get(9)?, // is_active
    ))
}

const HABIT_COLUMNS: &str = "id, user_id, name, habit_type, target_count, frequency_type, \
     frequency_days, frequency_interval_days, created_at, is_active";

fn log_from_row(habit_id: &HabitId, row: &rusqlite::Row<'_>) -> Result<CompletionLog, rusqlite::Error> {
    let date_str: String = row.get(0)?;
    let log_date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
        .map_err(|_| invalid_column(0, "Invalid date"))?;

    Ok(CompletionLog::from_existing(
        habit_id.clone(),
        log_date,
        row.get(1)?, // done
        row.get(2)?, // current_count
        row.get(3)?, // completion_percentage
        row.get(4)?, // notes
    ))
}

fn read_log(
    conn: &Connection,
    habit_id: &HabitId,
    log_date: NaiveDate,
) -> Result<Option<CompletionLog>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT log_date, done, current_count, completion_percentage, notes
         FROM habit_logs WHERE habit_id = ?1 AND log_date = ?2",
    )?;

    let log = stmt
        .query_row(
            params![habit_id.to_string(), log_date.format(DATE_FORMAT).to_string()],
            |row| log_from_row(habit_id, row),
        )
        .optional()?;

    Ok(log)
}

fn read_streak(conn: &Connection, habit_id: &HabitId) -> Result<StreakState, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT current_streak, longest_streak, last_completed_date, streak_start_date, total_completions
         FROM habit_streaks WHERE habit_id = ?1",
    )?;

    let parse_date = |s: Option<String>| {
        s.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok())
    };

    let streak = stmt
        .query_row(params![habit_id.to_string()], |row| {
            Ok(StreakState::from_existing(
                habit_id.clone(),
                row.get(0)?,
                row.get(1)?,
                parse_date(row.get(2)?),
                parse_date(row.get(3)?),
                row.get(4)?,
            ))
        })
        .optional()?;

    // No row yet means the habit was never completed: the Broken state.
    Ok(streak.unwrap_or_else(|| StreakState::new(habit_id.clone())))
}

fn read_completed_dates(
    conn: &Connection,
    habit_id: &HabitId,
) -> Result<Vec<NaiveDate>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT log_date FROM habit_logs
         WHERE habit_id = ?1 AND done = 1 ORDER BY log_date ASC",
    )?;

    let date_iter = stmt.query_map(params![habit_id.to_string()], |row| {
        let date_str: String = row.get(0)?;
        NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
            .map_err(|_| invalid_column(0, "Invalid date"))
    })?;

    let mut dates = Vec::new();
    for date in date_iter {
        dates.push(date?);
    }
    Ok(dates)
}

fn write_streak(conn: &Connection, streak: &StreakState) -> Result<(), StorageError> {
    conn.execute(
        "INSERT OR REPLACE INTO habit_streaks (
            habit_id, current_streak, longest_streak, last_completed_date,
            streak_start_date, total_completions, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            streak.habit_id.to_string(),
            streak.current_streak,
            streak.longest_streak,
            streak.last_completed.map(|d| d.format(DATE_FORMAT).to_string()),
            streak.streak_start.map(|d| d.format(DATE_FORMAT).to_string()),
            streak.total_completions,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl HabitStore for SqliteStore {
    /// Create a new habit in the database
    fn create_habit(&self, habit: &Habit) -> Result<(), StorageError> {
        let (habit_type, target_count) = kind_to_columns(&habit.kind);
        let (frequency_type, frequency_days, interval_days) =
            frequency_to_columns(&habit.frequency)?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO habits (
                id, user_id, name, habit_type, target_count, frequency_type,
                frequency_days, frequency_interval_days, created_at, is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                habit.id.to_string(),
                habit.user_id.to_string(),
                habit.name,
                habit_type,
                target_count,
                frequency_type,
                frequency_days,
                interval_days,
                habit.created_at.format(DATE_FORMAT).to_string(),
                habit.is_active,
            ],
        )?;

        tracing::debug!("Created habit: {} ({})", habit.name, habit.id);
        Ok(())
    }

    /// Get a habit by its ID
    fn get_habit(&self, habit_id: &HabitId) -> Result<Habit, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM habits WHERE id = ?1",
            HABIT_COLUMNS
        ))?;

        let result = stmt.query_row(params![habit_id.to_string()], habit_from_row);

        match result {
            Ok(habit) => Ok(habit),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            }),
            Err(e) => Err(StorageError::Query(e)),
        }
    }

    /// List a user's habits, newest first
    fn list_habits(&self, user_id: &UserId, active_only: bool) -> Result<Vec<Habit>, StorageError> {
        let mut sql = format!("SELECT {} FROM habits WHERE user_id = ?1", HABIT_COLUMNS);
        if active_only {
            sql.push_str(" AND is_active = 1");
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let habit_iter = stmt.query_map(params![user_id.to_string()], habit_from_row)?;

        let mut habits = Vec::new();
        for habit in habit_iter {
            habits.push(habit?);
        }

        Ok(habits)
    }

    /// Hard delete a habit; foreign keys cascade to logs and streak state
    fn delete_habit(&self, habit_id: &HabitId) -> Result<(), StorageError> {
        let conn = self.lock()?;
        let rows_affected = conn.execute(
            "DELETE FROM habits WHERE id = ?1",
            params![habit_id.to_string()],
        )?;

        if rows_affected == 0 {
            return Err(StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            });
        }

        tracing::debug!("Deleted habit: {}", habit_id);
        Ok(())
    }

    /// Pause or resume a habit
    fn set_habit_active(&self, habit_id: &HabitId, active: bool) -> Result<(), StorageError> {
        let conn = self.lock()?;
        let rows_affected = conn.execute(
            "UPDATE habits SET is_active = ?2 WHERE id = ?1",
            params![habit_id.to_string(), active],
        )?;

        if rows_affected == 0 {
            return Err(StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            });
        }

        Ok(())
    }

    fn get_log(
        &self,
        habit_id: &HabitId,
        log_date: NaiveDate,
    ) -> Result<Option<CompletionLog>, StorageError> {
        let conn = self.lock()?;
        read_log(&conn, habit_id, log_date)
    }

    fn completed_dates(&self, habit_id: &HabitId) -> Result<Vec<NaiveDate>, StorageError> {
        let conn = self.lock()?;
        read_completed_dates(&conn, habit_id)
    }

    /// Apply a log mutation and its streak transition in one transaction
    ///
    /// Holding the connection lock across the whole read-modify-write is what
    /// linearizes concurrent toggles on the same (habit, date) key.
    fn toggle_log(
        &self,
        habit: &Habit,
        log_date: NaiveDate,
        op: LogOp,
    ) -> Result<(CompletionLog, StreakState), StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut log = read_log(&tx, &habit.id, log_date)?
            .unwrap_or_else(|| CompletionLog::fresh(habit.id.clone(), log_date));
        let was_done = log.done;

        log.apply(&habit.kind, op);

        tx.execute(
            "INSERT INTO habit_logs (habit_id, log_date, done, current_count, completion_percentage, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (habit_id, log_date) DO UPDATE SET
                done = excluded.done,
                current_count = excluded.current_count,
                completion_percentage = excluded.completion_percentage,
                notes = excluded.notes",
            params![
                habit.id.to_string(),
                log_date.format(DATE_FORMAT).to_string(),
                log.done,
                log.current_count,
                log.completion_percentage,
                log.notes,
            ],
        )?;

        let mut streak = read_streak(&tx, &habit.id)?;
        if log.done != was_done {
            // Backfilling an older date or undoing the most recent one both
            // need the full history: rebuild so every pointer, including
            // longest_streak and last_completed, stays exact.
            let needs_rebuild = if log.done {
                streak.last_completed.is_some_and(|last| log_date < last)
            } else {
                streak.last_completed == Some(log_date)
            };

            if needs_rebuild {
                let dates = read_completed_dates(&tx, &habit.id)?;
                streak = StreakState::rebuild(habit.id.clone(), &dates);
            } else if log.done {
                streak.record_completion(log_date);
            } else {
                streak.uncount_completion();
            }
            write_streak(&tx, &streak)?;
        }

        tx.commit()?;

        tracing::debug!(
            "Toggled habit {} on {}: done={} count={}",
            habit.id,
            log_date,
            log.done,
            log.current_count
        );
        Ok((log, streak))
    }

    /// Get streak data for a habit
    fn get_streak(&self, habit_id: &HabitId) -> Result<StreakState, StorageError> {
        let conn = self.lock()?;
        read_streak(&conn, habit_id)
    }

    /// Count (total, completed) log rows for a habit
    fn log_counts(&self, habit_id: &HabitId) -> Result<(u32, u32), StorageError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(done), 0) FROM habit_logs WHERE habit_id = ?1",
            params![habit_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map_err(StorageError::Query)
    }
}
