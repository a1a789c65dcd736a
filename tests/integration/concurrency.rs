/// Concurrent toggles must serialize: no lost increments, no parity races

use std::sync::Arc;
use std::thread;

use habit_engine::{Frequency, HabitEngine, HabitKind, HabitStore};

use crate::{engine, session_on};

#[test]
fn concurrent_increments_are_never_lost() {
    let engine = Arc::new(engine());
    let session = session_on("2024-03-01");
    let date = session.today;

    let habit = engine
        .create_habit(
            &session,
            "Situps".to_string(),
            HabitKind::Countable { target_count: 100 },
            Frequency::Daily,
        )
        .unwrap();

    let threads: u32 = 8;
    let toggles_per_thread: u32 = 5;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let engine: Arc<HabitEngine> = Arc::clone(&engine);
            let session = session.clone();
            let habit_id = habit.id.clone();
            thread::spawn(move || {
                for _ in 0..toggles_per_thread {
                    engine
                        .toggle_habit(&session, &habit_id, date, Some(1))
                        .expect("toggle failed");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }

    let log = engine.store().get_log(&habit.id, date).unwrap().unwrap();
    assert_eq!(log.current_count, threads * toggles_per_thread);
}

#[test]
fn concurrent_boolean_toggles_keep_consistent_parity() {
    let engine = Arc::new(engine());
    let session = session_on("2024-03-01");
    let date = session.today;

    let habit = engine
        .create_habit(
            &session,
            "Inbox zero".to_string(),
            HabitKind::Boolean,
            Frequency::Daily,
        )
        .unwrap();

    // An odd number of serialized flips must land on done=true.
    let handles: Vec<_> = (0..5)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let session = session.clone();
            let habit_id = habit.id.clone();
            thread::spawn(move || {
                engine
                    .toggle_habit(&session, &habit_id, date, None)
                    .expect("toggle failed");
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }

    let log = engine.store().get_log(&habit.id, date).unwrap().unwrap();
    assert!(log.done);
    assert_eq!(log.current_count, 1);

    let streak = engine.store().get_streak(&habit.id).unwrap();
    assert_eq!(streak.current_streak, 1);
    assert_eq!(streak.total_completions, 1);
}
