//! Practice log entries and the streak/progress calculator.
//!
//! The calculator is a pure transform: the same entry list and reference
//! day always produce the same stats. Malformed dates are skipped rather
//! than failing the whole computation.

use serde::{Deserialize, Serialize};
use time::{Date, Duration, format_description::FormatItem, macros::format_description};
use uuid::Uuid;

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// One toggleable practice row. Uniqueness of (practice_id, date) is not
/// enforced at the storage level; [`toggle_entry`] finds-and-updates an
/// existing row for the day before appending a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeEntry {
    pub id: Uuid,
    pub practice_id: String,
    /// Calendar day in `YYYY-MM-DD` form.
    pub date: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStats {
    pub total_sessions: u32,
    pub total_minutes: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub this_week_sessions: u32,
}

pub fn parse_entry_date(raw: &str) -> Option<Date> {
    Date::parse(raw, DATE_FORMAT).ok()
}

/// Toggle completion for (practice_id, date), creating the row on first
/// toggle for that day. Returns the resulting completion state.
pub fn toggle_entry(entries: &mut Vec<PracticeEntry>, practice_id: &str, date: &str) -> bool {
    if let Some(existing) = entries
        .iter_mut()
        .find(|entry| entry.practice_id == practice_id && entry.date == date)
    {
        existing.completed = !existing.completed;
        return existing.completed;
    }

    entries.push(PracticeEntry {
        id: Uuid::new_v4(),
        practice_id: practice_id.to_string(),
        date: date.to_string(),
        completed: true,
        duration_minutes: None,
    });
    true
}

/// Compute progress stats over completed entries, relative to `today`.
///
/// The current-streak rule walks distinct completion days from most
/// recent to oldest and keeps counting while `days_diff <= streak`,
/// where `days_diff` is whole days between the last counted day and the
/// candidate. This is deliberately looser than a strict consecutive-day
/// check: the tolerated gap grows with the accumulated streak.
///
/// `previous_longest` carries the stored longest streak forward; the
/// result's `longest_streak` is `max(previous_longest, current_streak)`.
pub fn compute_progress(
    entries: &[PracticeEntry],
    previous_longest: u32,
    today: Date,
) -> ProgressStats {
    let completed: Vec<&PracticeEntry> =
        entries.iter().filter(|entry| entry.completed).collect();

    let total_sessions = completed.len() as u32;
    let total_minutes = completed
        .iter()
        .map(|entry| u64::from(entry.duration_minutes.unwrap_or(0)))
        .sum();

    let mut dates: Vec<Date> = completed
        .iter()
        .filter_map(|entry| parse_entry_date(&entry.date))
        .collect();
    dates.sort_unstable();
    dates.dedup();
    dates.reverse();

    let mut current_streak: u32 = 0;
    let mut check_date = today;
    for date in &dates {
        let days_diff = (check_date - *date).whole_days();
        if days_diff <= i64::from(current_streak) {
            current_streak += 1;
            check_date = *date;
        } else {
            break;
        }
    }

    let week_start = today - Duration::days(7);
    let this_week_sessions = completed
        .iter()
        .filter_map(|entry| parse_entry_date(&entry.date))
        .filter(|date| *date >= week_start && *date <= today)
        .count() as u32;

    ProgressStats {
        total_sessions,
        total_minutes,
        current_streak,
        longest_streak: previous_longest.max(current_streak),
        this_week_sessions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(today: Date, offset: i64) -> String {
        (today - Duration::days(offset))
            .format(DATE_FORMAT)
            .unwrap()
    }

    fn completed_on(today: Date, offsets: &[i64]) -> Vec<PracticeEntry> {
        offsets
            .iter()
            .map(|offset| PracticeEntry {
                id: Uuid::new_v4(),
                practice_id: "breathwork".into(),
                date: day(today, *offset),
                completed: true,
                duration_minutes: Some(10),
            })
            .collect()
    }

    fn today() -> Date {
        time::macros::date!(2025 - 06 - 15)
    }

    #[test]
    fn empty_log_yields_all_zero_stats() {
        let stats = compute_progress(&[], 0, today());
        assert_eq!(stats, ProgressStats::default());
    }

    #[test]
    fn three_consecutive_days_count_as_streak_of_three() {
        let entries = completed_on(today(), &[0, 1, 2]);
        let stats = compute_progress(&entries, 0, today());
        assert_eq!(stats.current_streak, 3);
    }

    #[test]
    fn one_day_gap_after_today_stops_the_streak_at_one() {
        // today counts (diff 0 <= 0), then today-2 has diff 2 > streak 1.
        let entries = completed_on(today(), &[0, 2]);
        let stats = compute_progress(&entries, 0, today());
        assert_eq!(stats.current_streak, 1);
    }

    #[test]
    fn accumulated_streak_tolerates_a_widening_gap() {
        // after [0,1] the streak is 2, so diff(today-1, today-3)=2 <= 2
        // still counts.
        let entries = completed_on(today(), &[0, 1, 3]);
        let stats = compute_progress(&entries, 0, today());
        assert_eq!(stats.current_streak, 3);
    }

    #[test]
    fn missing_today_breaks_the_streak() {
        let entries = completed_on(today(), &[1, 2]);
        let stats = compute_progress(&entries, 0, today());
        assert_eq!(stats.current_streak, 0);
    }

    #[test]
    fn weekly_window_is_inclusive_at_seven_days() {
        let entries = completed_on(today(), &[7, 8]);
        let stats = compute_progress(&entries, 0, today());
        assert_eq!(stats.this_week_sessions, 1);
    }

    #[test]
    fn duplicate_rows_for_one_day_count_once_for_the_streak() {
        let mut entries = completed_on(today(), &[0, 0, 1]);
        entries[1].duration_minutes = Some(25);
        let stats = compute_progress(&entries, 0, today());
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.total_minutes, 45);
    }

    #[test]
    fn malformed_dates_are_excluded_not_fatal() {
        let mut entries = completed_on(today(), &[0]);
        entries.push(PracticeEntry {
            id: Uuid::new_v4(),
            practice_id: "breathwork".into(),
            date: "someday".into(),
            completed: true,
            duration_minutes: Some(5),
        });
        let stats = compute_progress(&entries, 0, today());
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.this_week_sessions, 1);
        // unparseable rows still count toward totals
        assert_eq!(stats.total_sessions, 2);
    }

    #[test]
    fn longest_streak_carries_forward_the_running_maximum() {
        let entries = completed_on(today(), &[0]);
        let stats = compute_progress(&entries, 5, today());
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.longest_streak, 5);

        let run = completed_on(today(), &[0, 1, 2, 3, 4, 5, 6]);
        let stats = compute_progress(&run, 5, today());
        assert_eq!(stats.longest_streak, 7);
    }

    #[test]
    fn toggle_creates_then_flips_in_place() {
        let mut entries = Vec::new();
        assert!(toggle_entry(&mut entries, "breathwork", "2025-06-15"));
        assert_eq!(entries.len(), 1);
        assert!(!toggle_entry(&mut entries, "breathwork", "2025-06-15"));
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].completed);
        // a different practice on the same day gets its own row
        assert!(toggle_entry(&mut entries, "body-scan", "2025-06-15"));
        assert_eq!(entries.len(), 2);
    }
}
