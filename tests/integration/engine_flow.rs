/// End-to-end flows: scheduling, toggling, streak maintenance, statistics

use chrono::Weekday;
use habit_engine::{EngineError, Frequency, HabitId, HabitKind, HabitStore, StreakState};

use crate::{advance, engine, parse_date, session_on};

#[test]
fn weekly_days_habit_due_per_scenario() {
    // Habit created 2024-01-01, Mon/Wed/Fri given as indexes 1,3,5 with a
    // Sunday week start.
    let engine = engine();
    let session = session_on("2024-01-01");

    let days = session.week_start.weekdays_from_indexes(&[1, 3, 5]).unwrap();
    assert_eq!(days, vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]);

    let habit = engine
        .create_habit(
            &session,
            "Gym".to_string(),
            HabitKind::Boolean,
            Frequency::WeeklyDays(days),
        )
        .unwrap();

    let due_wednesday = engine.todays_habits(&session, parse_date("2024-01-03")).unwrap();
    assert_eq!(due_wednesday.len(), 1);
    assert_eq!(due_wednesday[0].habit.id, habit.id);
    assert!(due_wednesday[0].log.is_none()); // not acted on yet

    let due_thursday = engine.todays_habits(&session, parse_date("2024-01-04")).unwrap();
    assert!(due_thursday.is_empty());
}

#[test]
fn daily_habit_due_every_day_but_not_before_creation() {
    let engine = engine();
    let session = session_on("2024-01-10");

    engine
        .create_habit(
            &session,
            "Stretch".to_string(),
            HabitKind::Boolean,
            Frequency::Daily,
        )
        .unwrap();

    assert_eq!(engine.todays_habits(&session, parse_date("2024-01-10")).unwrap().len(), 1);
    assert_eq!(engine.todays_habits(&session, parse_date("2024-02-20")).unwrap().len(), 1);
    assert!(engine.todays_habits(&session, parse_date("2024-01-09")).unwrap().is_empty());
}

#[test]
fn countable_habit_done_exactly_at_target() {
    let engine = engine();
    let session = session_on("2024-03-01");
    let date = session.today;

    let habit = engine
        .create_habit(
            &session,
            "Drink water".to_string(),
            HabitKind::Countable { target_count: 4 },
            Frequency::Daily,
        )
        .unwrap();

    for (call, expected_pct) in [(1u32, 25u8), (2, 50), (3, 75)] {
        let log = engine.toggle_habit(&session, &habit.id, date, Some(1)).unwrap();
        assert_eq!(log.current_count, call);
        assert_eq!(log.completion_percentage, expected_pct);
        assert!(!log.done, "must not be done before the 4th call");
    }

    let log = engine.toggle_habit(&session, &habit.id, date, Some(1)).unwrap();
    assert_eq!(log.current_count, 4);
    assert_eq!(log.completion_percentage, 100);
    assert!(log.done, "must be done exactly after the 4th call");
}

#[test]
fn boolean_toggle_flips_and_streak_follows() {
    // Complete Feb 1 and Feb 2 consecutively, skip Feb 3, complete Feb 4.
    let engine = engine();
    let session = session_on("2024-02-01");

    let habit = engine
        .create_habit(
            &session,
            "Journal".to_string(),
            HabitKind::Boolean,
            Frequency::Daily,
        )
        .unwrap();

    engine.toggle_habit(&session, &habit.id, parse_date("2024-02-01"), None).unwrap();
    let session = advance(&session, "2024-02-02");
    engine.toggle_habit(&session, &habit.id, parse_date("2024-02-02"), None).unwrap();

    let streak = engine.store().get_streak(&habit.id).unwrap();
    assert_eq!(streak.current_streak, 2);
    assert_eq!(streak.longest_streak, 2);
    assert_eq!(streak.streak_start, Some(parse_date("2024-02-01")));

    let session = advance(&session, "2024-02-04");
    engine.toggle_habit(&session, &habit.id, parse_date("2024-02-04"), None).unwrap();

    let streak = engine.store().get_streak(&habit.id).unwrap();
    assert_eq!(streak.current_streak, 1, "gap restarts the streak");
    assert_eq!(streak.longest_streak, 2, "longest survives the gap");
    assert_eq!(streak.streak_start, Some(parse_date("2024-02-04")));
    assert_eq!(streak.total_completions, 3);
}

#[test]
fn plus_one_minus_one_restores_everything() {
    let engine = engine();
    let session = session_on("2024-03-01");
    let date = session.today;

    let habit = engine
        .create_habit(
            &session,
            "Pushups".to_string(),
            HabitKind::Countable { target_count: 2 },
            Frequency::Daily,
        )
        .unwrap();

    engine.toggle_habit(&session, &habit.id, date, Some(1)).unwrap();
    let log_before = engine.store().get_log(&habit.id, date).unwrap().unwrap();
    let streak_before = engine.store().get_streak(&habit.id).unwrap();

    engine.toggle_habit(&session, &habit.id, date, Some(1)).unwrap();
    engine.toggle_habit(&session, &habit.id, date, Some(-1)).unwrap();

    let log_after = engine.store().get_log(&habit.id, date).unwrap().unwrap();
    let streak_after = engine.store().get_streak(&habit.id).unwrap();
    assert_eq!(log_after, log_before);
    assert_eq!(streak_after, streak_before);
}

#[test]
fn undoing_latest_completion_restores_streak_and_longest() {
    let engine = engine();
    let session = session_on("2024-02-01");

    let habit = engine
        .create_habit(
            &session,
            "Read".to_string(),
            HabitKind::Boolean,
            Frequency::Daily,
        )
        .unwrap();

    engine.toggle_habit(&session, &habit.id, parse_date("2024-02-01"), None).unwrap();
    let session = advance(&session, "2024-02-02");
    engine.toggle_habit(&session, &habit.id, parse_date("2024-02-02"), None).unwrap();
    let session = advance(&session, "2024-02-03");
    engine.toggle_habit(&session, &habit.id, parse_date("2024-02-03"), None).unwrap();

    // Un-complete Feb 3 again: back to the 2-day streak, longest included.
    engine.toggle_habit(&session, &habit.id, parse_date("2024-02-03"), None).unwrap();

    let streak = engine.store().get_streak(&habit.id).unwrap();
    assert_eq!(streak.current_streak, 2);
    assert_eq!(streak.longest_streak, 2);
    assert_eq!(streak.last_completed, Some(parse_date("2024-02-02")));
    assert_eq!(streak.total_completions, 2);
}

#[test]
fn backfilling_an_older_date_merges_runs() {
    let engine = engine();
    let session = session_on("2024-02-01");

    let habit = engine
        .create_habit(
            &session,
            "Piano".to_string(),
            HabitKind::Boolean,
            Frequency::Daily,
        )
        .unwrap();

    // Complete Feb 5 first, then fill in the forgotten Feb 4.
    let session = advance(&session, "2024-02-05");
    engine.toggle_habit(&session, &habit.id, parse_date("2024-02-05"), None).unwrap();
    engine.toggle_habit(&session, &habit.id, parse_date("2024-02-04"), None).unwrap();

    let streak = engine.store().get_streak(&habit.id).unwrap();
    assert_eq!(streak.current_streak, 2, "adjacent backfill joins the run");
    assert_eq!(streak.last_completed, Some(parse_date("2024-02-05")),
        "the latest pointer must stay on the newest completed date");
    assert_eq!(streak.streak_start, Some(parse_date("2024-02-04")));
    assert_eq!(streak.total_completions, 2);
    engine.verify_streak(&session, &habit.id).unwrap();

    // The next day still extends the merged run.
    let session = advance(&session, "2024-02-06");
    engine.toggle_habit(&session, &habit.id, parse_date("2024-02-06"), None).unwrap();
    assert_eq!(engine.store().get_streak(&habit.id).unwrap().current_streak, 3);

    // A non-adjacent backfill only adds to the totals.
    engine.toggle_habit(&session, &habit.id, parse_date("2024-02-01"), None).unwrap();
    let streak = engine.store().get_streak(&habit.id).unwrap();
    assert_eq!(streak.current_streak, 3);
    assert_eq!(streak.last_completed, Some(parse_date("2024-02-06")));
    assert_eq!(streak.total_completions, 4);
    engine.verify_streak(&session, &habit.id).unwrap();
}

#[test]
fn undoing_old_date_keeps_current_streak() {
    let engine = engine();
    let session = session_on("2024-02-01");

    let habit = engine
        .create_habit(
            &session,
            "Meditate".to_string(),
            HabitKind::Boolean,
            Frequency::Daily,
        )
        .unwrap();

    for day in ["2024-02-01", "2024-02-02", "2024-02-03"] {
        let session = advance(&session, day);
        engine.toggle_habit(&session, &habit.id, parse_date(day), None).unwrap();
    }

    let session = advance(&session, "2024-02-03");
    engine.toggle_habit(&session, &habit.id, parse_date("2024-02-01"), None).unwrap();

    let streak = engine.store().get_streak(&habit.id).unwrap();
    assert_eq!(streak.current_streak, 3, "old undo does not break today's streak");
    assert_eq!(streak.total_completions, 2);
}

#[test]
fn streak_state_is_reconstructible_by_replay() {
    let engine = engine();
    let session = session_on("2024-01-01");

    let habit = engine
        .create_habit(
            &session,
            "Walk".to_string(),
            HabitKind::Boolean,
            Frequency::Daily,
        )
        .unwrap();

    // Completions with a gap and a latest-undo in the middle.
    for day in ["2024-01-01", "2024-01-02", "2024-01-03"] {
        let session = advance(&session, day);
        engine.toggle_habit(&session, &habit.id, parse_date(day), None).unwrap();
    }
    let session = advance(&session, "2024-01-03");
    engine.toggle_habit(&session, &habit.id, parse_date("2024-01-03"), None).unwrap();
    let session = advance(&session, "2024-01-06");
    engine.toggle_habit(&session, &habit.id, parse_date("2024-01-06"), None).unwrap();

    let stored = engine.store().get_streak(&habit.id).unwrap();
    let dates = engine.store().completed_dates(&habit.id).unwrap();
    let rebuilt = StreakState::rebuild(habit.id.clone(), &dates);
    assert_eq!(stored, rebuilt);

    engine.verify_streak(&session, &habit.id).unwrap();
}

#[test]
fn set_completion_is_idempotent_under_retries() {
    let engine = engine();
    let session = session_on("2024-03-01");
    let date = session.today;

    let habit = engine
        .create_habit(
            &session,
            "Floss".to_string(),
            HabitKind::Boolean,
            Frequency::Daily,
        )
        .unwrap();

    // A retried set-state call cannot double-flip the way toggle would.
    for _ in 0..3 {
        let log = engine.set_completion(&session, &habit.id, date, true).unwrap();
        assert!(log.done);
    }
    let streak = engine.store().get_streak(&habit.id).unwrap();
    assert_eq!(streak.current_streak, 1);
    assert_eq!(streak.total_completions, 1);

    for _ in 0..2 {
        let log = engine.set_completion(&session, &habit.id, date, false).unwrap();
        assert!(!log.done);
    }
    let streak = engine.store().get_streak(&habit.id).unwrap();
    assert_eq!(streak.total_completions, 0);
}

#[test]
fn rejects_future_dates_unknown_habits_and_inactive_habits() {
    let engine = engine();
    let session = session_on("2024-03-01");

    let habit = engine
        .create_habit(
            &session,
            "Run".to_string(),
            HabitKind::Boolean,
            Frequency::Daily,
        )
        .unwrap();

    let future = engine.toggle_habit(&session, &habit.id, parse_date("2024-03-02"), None);
    assert!(matches!(future, Err(EngineError::InvalidDate(_))));

    let unknown = engine.toggle_habit(&session, &HabitId::new(), session.today, None);
    assert!(matches!(unknown, Err(EngineError::NotFound { .. })));

    // Another user cannot see or toggle this habit.
    let stranger = session_on("2024-03-01");
    let foreign = engine.toggle_habit(&stranger, &habit.id, stranger.today, None);
    assert!(matches!(foreign, Err(EngineError::NotFound { .. })));

    engine.set_habit_active(&session, &habit.id, false).unwrap();
    let paused = engine.toggle_habit(&session, &habit.id, session.today, None);
    assert!(matches!(paused, Err(EngineError::InactiveHabit { .. })));

    // An inactive habit also disappears from the today view.
    assert!(engine.todays_habits(&session, session.today).unwrap().is_empty());
}

#[test]
fn statistics_aggregate_logs_and_streaks() {
    let engine = engine();
    let session = session_on("2024-02-01");

    let habit = engine
        .create_habit(
            &session,
            "Write".to_string(),
            HabitKind::Countable { target_count: 2 },
            Frequency::Daily,
        )
        .unwrap();

    // Feb 1 completed (2/2), Feb 2 only half done.
    engine.toggle_habit(&session, &habit.id, parse_date("2024-02-01"), Some(2)).unwrap();
    let session = advance(&session, "2024-02-02");
    engine.toggle_habit(&session, &habit.id, parse_date("2024-02-02"), Some(1)).unwrap();

    let stats = engine.habit_statistics(&session, &habit.id).unwrap();
    assert_eq!(stats.total_logs, 2);
    assert!((stats.completion_rate - 0.5).abs() < f64::EPSILON);
    assert_eq!(stats.current_streak, 1);
    assert_eq!(stats.longest_streak, 1);
}

#[test]
fn deleting_a_habit_cascades_to_logs_and_streaks() {
    let engine = engine();
    let session = session_on("2024-02-01");

    let habit = engine
        .create_habit(
            &session,
            "Cook".to_string(),
            HabitKind::Boolean,
            Frequency::Daily,
        )
        .unwrap();
    engine.toggle_habit(&session, &habit.id, session.today, None).unwrap();

    engine.delete_habit(&session, &habit.id).unwrap();

    assert!(matches!(
        engine.habit_statistics(&session, &habit.id),
        Err(EngineError::NotFound { .. })
    ));
    assert_eq!(engine.store().log_counts(&habit.id).unwrap(), (0, 0));
    assert!(engine.store().completed_dates(&habit.id).unwrap().is_empty());
    assert!(engine.store().get_streak(&habit.id).unwrap().is_broken());
}

#[test]
fn interval_habit_due_dates_anchor_at_creation() {
    let engine = engine();
    let session = session_on("2024-01-01");

    engine
        .create_habit(
            &session,
            "Water plants".to_string(),
            HabitKind::Boolean,
            Frequency::Interval(3),
        )
        .unwrap();

    for (date, due) in [
        ("2024-01-01", true),
        ("2024-01-02", false),
        ("2024-01-03", false),
        ("2024-01-04", true),
        ("2024-01-07", true),
    ] {
        let entries = engine.todays_habits(&session, parse_date(date)).unwrap();
        assert_eq!(entries.len(), usize::from(due), "due mismatch on {}", date);
    }
}

#[test]
fn tampered_streak_state_is_reported_not_repaired() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("habits.db");
    let session = session_on("2024-02-01");

    let habit = {
        let engine = habit_engine::HabitEngine::open(db_path.clone()).unwrap();
        let habit = engine
            .create_habit(
                &session,
                "Swim".to_string(),
                HabitKind::Boolean,
                Frequency::Daily,
            )
            .unwrap();
        engine.toggle_habit(&session, &habit.id, session.today, None).unwrap();
        habit
    };

    // Corrupt the cached counters behind the engine's back.
    {
        let conn = rusqlite::Connection::open(&db_path).unwrap();
        conn.execute(
            "UPDATE habit_streaks SET current_streak = 7, longest_streak = 9 WHERE habit_id = ?1",
            [habit.id.to_string()],
        )
        .unwrap();
    }

    let engine = habit_engine::HabitEngine::open(db_path).unwrap();
    let result = engine.verify_streak(&session, &habit.id);
    assert!(matches!(result, Err(EngineError::Inconsistent { .. })));

    // The bad row is surfaced, never silently rewritten.
    let streak = engine.store().get_streak(&habit.id).unwrap();
    assert_eq!(streak.current_streak, 7);
    assert_eq!(streak.longest_streak, 9);
}

#[test]
fn data_survives_reopening_the_database() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("habits.db");
    let session = session_on("2024-02-01");

    let habit = {
        let engine = habit_engine::HabitEngine::open(db_path.clone()).unwrap();
        let habit = engine
            .create_habit(
                &session,
                "Persist".to_string(),
                HabitKind::Boolean,
                Frequency::Daily,
            )
            .unwrap();
        engine.toggle_habit(&session, &habit.id, session.today, None).unwrap();
        habit
    };

    let engine = habit_engine::HabitEngine::open(db_path).unwrap();
    let streak = engine.store().get_streak(&habit.id).unwrap();
    assert_eq!(streak.current_streak, 1);
    engine.verify_streak(&session, &habit.id).unwrap();
}
