/// Command-line front end for the habit engine
///
/// This is thin presentation glue: it resolves a session (user, timezone
/// offset, week-start preference) from flags and forwards each subcommand to
/// the engine. Output is JSON on stdout; logs go to stderr.

use clap::{Parser, Subcommand};
use chrono::{FixedOffset, NaiveDate};
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

use habit_engine::{
    Frequency, HabitEngine, HabitId, HabitKind, Session, UserId, WeekStart,
};

/// Get the default database path with a fallback strategy
fn get_default_database_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let potential_paths = [
        dirs::data_dir().map(|mut p| {
            p.push("habit_engine");
            p
        }),
        dirs::home_dir().map(|mut p| {
            p.push(".habit_engine");
            p
        }),
        std::env::current_dir().ok().map(|mut p| {
            p.push(".habit_engine");
            p
        }),
    ];

    for potential_path in potential_paths.iter().flatten() {
        if std::fs::create_dir_all(potential_path).is_ok() {
            let mut db_path = potential_path.clone();
            db_path.push("habits.db");
            return Ok(db_path);
        }
    }

    let mut temp_path = std::env::temp_dir();
    temp_path.push("habit_engine");
    std::fs::create_dir_all(&temp_path)?;
    temp_path.push("habits.db");

    tracing::warn!("Using temporary directory for database: {}", temp_path.display());
    Ok(temp_path)
}

/// Command line arguments for the habit engine CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    /// If not provided, uses a default location in the user's data directory
    #[arg(long)]
    database: Option<PathBuf>,

    /// Acting user id (defaults to the single local user)
    #[arg(long)]
    user: Option<Uuid>,

    /// First day of the week: sunday or monday
    #[arg(long, default_value = "monday")]
    week_start: WeekStartArg,

    /// Caller's timezone as minutes east of UTC (resolves "today")
    #[arg(long, default_value_t = 0)]
    utc_offset_minutes: i32,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum WeekStartArg {
    Sunday,
    Monday,
}

impl From<WeekStartArg> for WeekStart {
    fn from(arg: WeekStartArg) -> Self {
        match arg {
            WeekStartArg::Sunday => WeekStart::Sunday,
            WeekStartArg::Monday => WeekStart::Monday,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a new habit
    Add {
        /// Display name
        #[arg(long)]
        name: String,

        /// Daily target for countable habits; omit for a yes/no habit
        #[arg(long)]
        target: Option<u32>,

        /// Days of the week, as 0-6 indexes from your week start (e.g. 1,3,5)
        #[arg(long, value_delimiter = ',')]
        days: Option<Vec<u8>>,

        /// Repeat every N days, counted from creation
        #[arg(long)]
        every: Option<u32>,
    },

    /// List habits
    List {
        /// Include paused habits
        #[arg(long)]
        all: bool,
    },

    /// Show the habits due on a date with their completion state
    Today {
        /// Date to evaluate (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Toggle a habit's completion log for a date
    Toggle {
        #[arg(long)]
        habit: Uuid,

        /// Date to log (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Countable habits: units to add (negative undoes)
        #[arg(long)]
        increment: Option<i64>,
    },

    /// Set a date's completion state outright (retry-safe)
    Set {
        #[arg(long)]
        habit: Uuid,

        #[arg(long, action = clap::ArgAction::Set)]
        done: bool,

        /// Date to set (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show aggregated statistics for a habit
    Stats {
        #[arg(long)]
        habit: Uuid,
    },

    /// Verify a habit's streak state against its log history
    Check {
        #[arg(long)]
        habit: Uuid,
    },

    /// Pause or resume a habit
    SetActive {
        #[arg(long)]
        habit: Uuid,

        #[arg(long, action = clap::ArgAction::Set)]
        active: bool,
    },

    /// Delete a habit and all of its history
    Delete {
        #[arg(long)]
        habit: Uuid,
    },
}

fn build_frequency(
    session: &Session,
    days: Option<Vec<u8>>,
    every: Option<u32>,
) -> Result<Frequency, Box<dyn std::error::Error>> {
    match (days, every) {
        (Some(_), Some(_)) => Err("Specify either --days or --every, not both".into()),
        (Some(indexes), None) => {
            let weekdays = session.week_start.weekdays_from_indexes(&indexes)?;
            Ok(Frequency::WeeklyDays(weekdays))
        }
        (None, Some(interval)) => Ok(Frequency::Interval(interval)),
        (None, None) => Ok(Frequency::Daily),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Set up logging based on command line flags
    let log_level = if args.verbose {
        "debug"
    } else if args.debug {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("habit_engine={}", log_level))
        .with_writer(std::io::stderr) // Keep stdout clean for JSON output
        .init();

    let db_path = match args.database {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            path
        }
        None => get_default_database_path()?,
    };

    info!("Using database at: {}", db_path.display());

    let engine = HabitEngine::open(db_path)?;

    let timezone = FixedOffset::east_opt(args.utc_offset_minutes * 60)
        .ok_or("UTC offset out of range")?;
    let user_id = UserId(args.user.unwrap_or_else(Uuid::nil));
    let session = Session::resolve(user_id, timezone, args.week_start.into());

    match args.command {
        Command::Add { name, target, days, every } => {
            let kind = match target {
                Some(target_count) => HabitKind::Countable { target_count },
                None => HabitKind::Boolean,
            };
            let frequency = build_frequency(&session, days, every)?;
            let habit = engine.create_habit(&session, name, kind, frequency)?;
            print_json(&habit)?;
        }
        Command::List { all } => {
            let habits = engine.list_habits(&session, !all)?;
            print_json(&habits)?;
        }
        Command::Today { date } => {
            let date = date.unwrap_or(session.today);
            let entries = engine.todays_habits(&session, date)?;
            print_json(&entries)?;
        }
        Command::Toggle { habit, date, increment } => {
            let date = date.unwrap_or(session.today);
            let log = engine.toggle_habit(&session, &HabitId(habit), date, increment)?;
            print_json(&log)?;
        }
        Command::Set { habit, done, date } => {
            let date = date.unwrap_or(session.today);
            let log = engine.set_completion(&session, &HabitId(habit), date, done)?;
            print_json(&log)?;
        }
        Command::Stats { habit } => {
            let stats = engine.habit_statistics(&session, &HabitId(habit))?;
            print_json(&stats)?;
        }
        Command::Check { habit } => {
            engine.verify_streak(&session, &HabitId(habit))?;
            eprintln!("Streak state matches the log history");
        }
        Command::SetActive { habit, active } => {
            engine.set_habit_active(&session, &HabitId(habit), active)?;
        }
        Command::Delete { habit } => {
            engine.delete_habit(&session, &HabitId(habit))?;
        }
    }

    Ok(())
}
