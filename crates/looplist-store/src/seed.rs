//! Demo data for a fresh store.
//!
//! Four public loops owned by users "1" to "4", plus one generated check-in
//! per day from each loop's start date through `today`.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use looplist_core::{CheckIn, Frequency, Id, Loop, LoopStatus, Visibility};
use rand::Rng;

struct DemoLoop {
    id: &'static str,
    title: &'static str,
    emoji: &'static str,
    frequency: Frequency,
    start: (i32, u32, u32),
    current_streak: u32,
    longest_streak: u32,
    completion_rate: f64,
    cheers: u32,
    clones: u32,
}

const DEMO_LOOPS: [DemoLoop; 4] = [
    DemoLoop {
        id: "1",
        title: "Read 10 pages",
        emoji: "📚",
        frequency: Frequency::Daily,
        start: (2023, 5, 1),
        current_streak: 7,
        longest_streak: 14,
        completion_rate: 0.85,
        cheers: 24,
        clones: 5,
    },
    DemoLoop {
        id: "2",
        title: "Morning meditation",
        emoji: "🧘‍♂️",
        frequency: Frequency::Daily,
        start: (2023, 4, 15),
        current_streak: 30,
        longest_streak: 30,
        completion_rate: 0.95,
        cheers: 42,
        clones: 12,
    },
    DemoLoop {
        id: "3",
        title: "No sugar after 7pm",
        emoji: "🍭",
        frequency: Frequency::Daily,
        start: (2023, 6, 10),
        current_streak: 4,
        longest_streak: 21,
        completion_rate: 0.7,
        cheers: 18,
        clones: 7,
    },
    DemoLoop {
        id: "4",
        title: "Workout",
        emoji: "💪",
        frequency: Frequency::ThreeTimesWeekly,
        start: (2023, 5, 20),
        current_streak: 3,
        longest_streak: 6,
        completion_rate: 0.8,
        cheers: 31,
        clones: 9,
    },
];

/// The demo loops, exactly as shipped with the web client.
pub fn demo_loops() -> Vec<Loop> {
    DEMO_LOOPS
        .iter()
        .map(|demo| {
            let (y, m, d) = demo.start;
            let start = midnight(y, m, d);
            Loop {
                id: Id::from_string(demo.id),
                title: demo.title.to_string(),
                emoji: Some(demo.emoji.to_string()),
                cover_image: None,
                frequency: demo.frequency,
                custom_days: None,
                category: None,
                start_date: start,
                visibility: Visibility::Public,
                user_id: Id::from_string(demo.id),
                created_at: start,
                current_streak: demo.current_streak,
                longest_streak: demo.longest_streak,
                completion_rate: demo.completion_rate,
                status: LoopStatus::Active,
                cheers: demo.cheers,
                clones: demo.clones,
            }
        })
        .collect()
}

fn midnight(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// One check-in per day from each loop's start through `today`, completed
/// with probability `completion_rate`.
pub fn demo_check_ins<R: Rng + ?Sized>(
    loops: &[Loop],
    today: NaiveDate,
    completion_rate: f64,
    rng: &mut R,
) -> Vec<CheckIn> {
    let rate = completion_rate.clamp(0.0, 1.0);
    let mut check_ins = Vec::new();
    for demo in loops {
        let start = demo.start_date.date_naive();
        for date in start.iter_days().take_while(|date| *date <= today) {
            check_ins.push(CheckIn {
                id: CheckIn::id_for(&demo.id, date),
                loop_id: demo.id.clone(),
                user_id: demo.user_id.clone(),
                date,
                completed: rng.gen_bool(rate),
            });
        }
    }
    check_ins
}
