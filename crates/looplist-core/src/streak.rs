//! Streak and completion-rate recomputation.
//!
//! Runs after every check-in, over the full check-in history of the loop.
//! Aggregates are never maintained incrementally.

use crate::types::{CheckIn, Id, Loop, LoopStatus, StreakPolicy};
use chrono::{DateTime, NaiveDate, Utc};

/// Truncate an instant to its calendar day (UTC).
pub fn normalize_day(at: DateTime<Utc>) -> NaiveDate {
    at.date_naive()
}

/// Completed check-ins over all check-ins, or 0 when there are none.
pub fn completion_rate<'a>(check_ins: impl IntoIterator<Item = &'a CheckIn>) -> f64 {
    let (total, completed) = check_ins
        .into_iter()
        .fold((0_u32, 0_u32), |(total, completed), ci| {
            (total + 1, completed + u32::from(ci.completed))
        });
    if total == 0 {
        0.0
    } else {
        f64::from(completed) / f64::from(total)
    }
}

/// Result of walking a user's check-ins from the most recent day backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunScan {
    /// Completed check-ins before the first miss.
    pub run_length: u32,
    /// Whether a miss stopped the walk.
    pub break_detected: bool,
}

/// Count leading completions. `newest_first` must be sorted by date, descending.
pub fn scan_recent_run<'a>(newest_first: impl IntoIterator<Item = &'a CheckIn>) -> RunScan {
    let mut scan = RunScan::default();
    for check_in in newest_first {
        if !check_in.completed {
            scan.break_detected = true;
            break;
        }
        scan.run_length += 1;
    }
    scan
}

/// Turn a scan into the loop's current streak.
///
/// `completed` is the flag of the check-in that triggered the recomputation;
/// that check-in is already part of the scan.
pub fn resolve_current_streak(policy: StreakPolicy, scan: RunScan, completed: bool) -> u32 {
    match policy {
        StreakPolicy::Legacy => {
            if scan.break_detected && !completed {
                0
            } else if completed {
                scan.run_length + 1
            } else {
                scan.run_length
            }
        }
        StreakPolicy::Consecutive => scan.run_length,
    }
}

/// Recomputed aggregates for one loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopStats {
    pub completion_rate: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub status: LoopStatus,
}

impl LoopStats {
    pub fn apply(&self, target: &mut Loop) {
        target.completion_rate = self.completion_rate;
        target.current_streak = self.current_streak;
        target.longest_streak = self.longest_streak;
        target.status = self.status;
    }
}

/// Recompute a loop's aggregates after `caller` recorded a check-in.
///
/// The completion rate covers every user's check-ins for the loop; the streak
/// only walks the caller's own history.
pub fn recompute(
    target: &Loop,
    check_ins: &[CheckIn],
    caller: &Id,
    completed: bool,
    policy: StreakPolicy,
) -> LoopStats {
    let loop_check_ins: Vec<&CheckIn> = check_ins
        .iter()
        .filter(|ci| ci.loop_id == target.id)
        .collect();
    let completion_rate = completion_rate(loop_check_ins.iter().copied());

    let mut history: Vec<&CheckIn> = loop_check_ins
        .into_iter()
        .filter(|ci| &ci.user_id == caller)
        .collect();
    history.sort_by(|a, b| b.date.cmp(&a.date));

    let scan = scan_recent_run(history);
    let current_streak = resolve_current_streak(policy, scan, completed);
    let longest_streak = current_streak.max(target.longest_streak);
    let status = if current_streak > 0 {
        LoopStatus::Active
    } else {
        LoopStatus::Broken
    };

    LoopStats {
        completion_rate,
        current_streak,
        longest_streak,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Frequency, Visibility};
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn owner() -> Id {
        Id::from_string("owner")
    }

    fn new_loop() -> Loop {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        Loop {
            id: Id::from_string("loop-1"),
            title: "Walk".to_string(),
            emoji: None,
            cover_image: None,
            frequency: Frequency::Daily,
            custom_days: None,
            category: None,
            start_date: start,
            visibility: Visibility::Private,
            user_id: owner(),
            created_at: start,
            current_streak: 0,
            longest_streak: 0,
            completion_rate: 0.0,
            status: LoopStatus::Active,
            cheers: 0,
            clones: 0,
        }
    }

    fn check_in(user: &Id, date: NaiveDate, completed: bool) -> CheckIn {
        CheckIn {
            id: CheckIn::id_for(&Id::from_string("loop-1"), date),
            loop_id: Id::from_string("loop-1"),
            user_id: user.clone(),
            date,
            completed,
        }
    }

    /// Upsert then recompute, the way the store does it.
    fn record(
        target: &mut Loop,
        history: &mut Vec<CheckIn>,
        date: NaiveDate,
        completed: bool,
        policy: StreakPolicy,
    ) -> LoopStats {
        let user = owner();
        if let Some(existing) = history.iter_mut().find(|ci| ci.matches(&target.id, &user, date)) {
            existing.completed = completed;
        } else {
            history.push(check_in(&user, date, completed));
        }
        let stats = recompute(target, history, &user, completed, policy);
        stats.apply(target);
        stats
    }

    #[test]
    fn normalize_day_strips_time_of_day() {
        let late = Utc.with_ymd_and_hms(2024, 6, 3, 23, 59, 59).unwrap();
        let early = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 1).unwrap();
        assert_eq!(normalize_day(late), day(3));
        assert_eq!(normalize_day(late), normalize_day(early));
    }

    #[test]
    fn completion_rate_is_zero_without_check_ins() {
        assert!(completion_rate(std::iter::empty()).abs() < f64::EPSILON);
    }

    #[test]
    fn completion_rate_counts_completed_fraction() {
        let history = vec![
            check_in(&owner(), day(1), true),
            check_in(&owner(), day(2), false),
            check_in(&owner(), day(3), true),
            check_in(&owner(), day(4), true),
        ];
        assert!((completion_rate(&history) - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn scan_stops_at_first_miss() {
        let history = [
            check_in(&owner(), day(5), true),
            check_in(&owner(), day(4), true),
            check_in(&owner(), day(3), false),
            check_in(&owner(), day(2), true),
        ];
        let scan = scan_recent_run(&history);
        assert_eq!(
            scan,
            RunScan {
                run_length: 2,
                break_detected: true
            }
        );
    }

    #[test]
    fn legacy_policy_adds_one_on_completion() {
        let scan = RunScan {
            run_length: 2,
            break_detected: false,
        };
        assert_eq!(resolve_current_streak(StreakPolicy::Legacy, scan, true), 3);
        assert_eq!(resolve_current_streak(StreakPolicy::Consecutive, scan, true), 2);
    }

    #[test]
    fn legacy_policy_keeps_run_when_break_is_older_than_completion() {
        let scan = RunScan {
            run_length: 1,
            break_detected: true,
        };
        assert_eq!(resolve_current_streak(StreakPolicy::Legacy, scan, true), 2);
        assert_eq!(resolve_current_streak(StreakPolicy::Legacy, scan, false), 0);
    }

    #[test]
    fn legacy_policy_reproduces_web_client_sequence() {
        let mut target = new_loop();
        let mut history = Vec::new();
        let policy = StreakPolicy::Legacy;

        let first = record(&mut target, &mut history, day(1), true, policy);
        assert_eq!(first.current_streak, 2);
        let second = record(&mut target, &mut history, day(2), true, policy);
        assert_eq!(second.current_streak, 3);
        let third = record(&mut target, &mut history, day(3), false, policy);
        assert_eq!(third.current_streak, 0);
        assert_eq!(third.status, LoopStatus::Broken);
        assert_eq!(third.longest_streak, 3);
    }

    #[test]
    fn consecutive_policy_builds_and_breaks_streak() {
        let mut target = new_loop();
        let mut history = Vec::new();
        let policy = StreakPolicy::Consecutive;

        let first = record(&mut target, &mut history, day(1), true, policy);
        assert_eq!(first.current_streak, 1);
        assert_eq!(first.status, LoopStatus::Active);
        let second = record(&mut target, &mut history, day(2), true, policy);
        assert_eq!(second.current_streak, 2);
        let third = record(&mut target, &mut history, day(3), false, policy);
        assert_eq!(third.current_streak, 0);
        assert_eq!(third.status, LoopStatus::Broken);
        assert_eq!(third.longest_streak, 2);
        assert!((third.completion_rate - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn overwriting_a_miss_restores_the_streak() {
        let mut target = new_loop();
        let mut history = Vec::new();
        let policy = StreakPolicy::Consecutive;

        record(&mut target, &mut history, day(1), true, policy);
        record(&mut target, &mut history, day(2), false, policy);
        let fixed = record(&mut target, &mut history, day(2), true, policy);
        assert_eq!(history.len(), 2);
        assert_eq!(fixed.current_streak, 2);
        assert!((fixed.completion_rate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn longest_streak_never_decreases() {
        let mut target = new_loop();
        target.longest_streak = 10;
        let mut history = Vec::new();
        for (d, completed) in [(1, true), (2, false), (3, true), (4, true), (5, false)] {
            let before = target.longest_streak;
            let stats = record(&mut target, &mut history, day(d), completed, StreakPolicy::Legacy);
            assert!(stats.longest_streak >= before);
            assert!(stats.longest_streak >= stats.current_streak);
        }
        assert_eq!(target.longest_streak, 10);
    }

    #[test]
    fn streak_ignores_other_users_but_rate_does_not() {
        let target = new_loop();
        let other = Id::from_string("friend");
        let history = vec![
            check_in(&other, day(1), false),
            check_in(&other, day(2), false),
            check_in(&owner(), day(1), true),
            check_in(&owner(), day(2), true),
        ];
        let stats = recompute(&target, &history, &owner(), true, StreakPolicy::Consecutive);
        assert_eq!(stats.current_streak, 2);
        assert!((stats.completion_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn recompute_ignores_other_loops() {
        let target = new_loop();
        let mut foreign = check_in(&owner(), day(1), false);
        foreign.loop_id = Id::from_string("loop-2");
        let history = vec![foreign, check_in(&owner(), day(1), true)];
        let stats = recompute(&target, &history, &owner(), true, StreakPolicy::Consecutive);
        assert_eq!(stats.current_streak, 1);
        assert!((stats.completion_rate - 1.0).abs() < f64::EPSILON);
    }
}
