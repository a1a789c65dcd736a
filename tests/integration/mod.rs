/// Integration tests driving the engine end-to-end against a real database

use chrono::NaiveDate;
use habit_engine::{HabitEngine, Session, UserId, WeekStart};

mod concurrency;
mod engine_flow;

/// A fresh engine over a private in-memory database
pub fn engine() -> HabitEngine {
    HabitEngine::open_in_memory().expect("Failed to open in-memory engine")
}

/// A session for a new user pinned to an explicit "today"
pub fn session_on(date: &str) -> Session {
    Session::on_date(UserId::new(), parse_date(date), WeekStart::Sunday)
}

/// The same user's session on a later date
pub fn advance(session: &Session, date: &str) -> Session {
    Session::on_date(session.user_id.clone(), parse_date(date), session.week_start)
}

pub fn parse_date(date: &str) -> NaiveDate {
    date.parse().expect("Invalid test date")
}
