//! Insight engine: streak and recap messages over a user's entry history.
//!
//! Everything here is a pure function of the entry list and the date that
//! counts as "today". Nothing is cached; callers recompute on every read.

use crate::emotion::Emotion;
use crate::entry::Entry;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Days covered by the same-emotion run and the "this week" half of the
/// happiness comparison (today plus six prior days).
pub const WEEK_DAYS: u64 = 7;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insights {
    pub streak: u32,
    pub recap: Vec<String>,
}

impl Insights {
    pub fn compute(entries: &[Entry], today: NaiveDate) -> Self {
        Self {
            streak: current_streak(entries, today),
            recap: recap_messages(entries, today),
        }
    }
}

/// Date → final label. A later duplicate for the same date wins.
fn by_date(entries: &[Entry]) -> BTreeMap<NaiveDate, Emotion> {
    entries.iter().map(|e| (e.date, e.final_emotion)).collect()
}

fn days_before(today: NaiveDate, n: u64) -> Option<NaiveDate> {
    today.checked_sub_days(Days::new(n))
}

/// Consecutive days with an entry, walking back from `today`.
/// A missing `today` means a streak of 0.
pub fn current_streak(entries: &[Entry], today: NaiveDate) -> u32 {
    let map = by_date(entries);
    let mut streak = 0;
    let mut cursor = Some(today);
    while let Some(day) = cursor {
        if !map.contains_key(&day) {
            break;
        }
        streak += 1;
        cursor = day.pred_opt();
    }
    streak
}

/// Recap messages for `today`, in a fixed order, duplicates removed.
pub fn recap_messages(entries: &[Entry], today: NaiveDate) -> Vec<String> {
    let map = by_date(entries);
    if map.is_empty() {
        return Vec::new();
    }

    let mut messages = Vec::new();
    messages.extend(run_length_message(&map, today));
    messages.extend(weekly_happiness_message(&map, today));
    messages.extend(day_over_day_message(&map, today));
    dedup(messages)
}

fn run_length_message(map: &BTreeMap<NaiveDate, Emotion>, today: NaiveDate) -> Option<String> {
    let current = *map.get(&today)?;
    let mut run = 1;
    for back in 1..WEEK_DAYS {
        match days_before(today, back).and_then(|d| map.get(&d)) {
            Some(&label) if label == current => run += 1,
            _ => break,
        }
    }
    (run >= 2).then(|| format!("You have been {} for {} days in a row.", current, run))
}

fn weekly_happiness_message(
    map: &BTreeMap<NaiveDate, Emotion>,
    today: NaiveDate,
) -> Option<String> {
    let happy_in = |range: std::ops::Range<u64>| {
        range
            .filter_map(|back| days_before(today, back))
            .filter(|d| map.get(d) == Some(&Emotion::Happy))
            .count()
    };
    let last = happy_in(0..WEEK_DAYS);
    let previous = happy_in(WEEK_DAYS..2 * WEEK_DAYS);

    (last > previous && last > 0).then(|| "Your happiness increased this week.".to_string())
}

fn day_over_day_message(map: &BTreeMap<NaiveDate, Emotion>, today: NaiveDate) -> Option<String> {
    let yesterday = *map.get(&today.pred_opt()?)?;
    let current = *map.get(&today)?;
    if yesterday == current {
        return None;
    }
    let verb = if current.rank() > yesterday.rank() {
        "improved"
    } else {
        "changed"
    };
    Some(format!(
        "Yesterday your emotion was {}, today it {} to {}.",
        yesterday, verb, current
    ))
}

fn dedup(messages: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(messages.len());
    for m in messages {
        if !out.contains(&m) {
            out.push(m);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::EmotionScores;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn entry(date: &str, label: Emotion) -> Entry {
        Entry {
            date: day(date),
            diary: String::new(),
            face: EmotionScores::one_hot(label),
            voice: EmotionScores::default(),
            final_emotion: label,
        }
    }

    const TODAY: &str = "2025-11-14";

    #[test]
    fn test_streak_empty_is_zero() {
        assert_eq!(current_streak(&[], day(TODAY)), 0);
    }

    #[test]
    fn test_streak_only_today_is_one() {
        let entries = vec![entry(TODAY, Emotion::Sad)];
        assert_eq!(current_streak(&entries, day(TODAY)), 1);
    }

    #[test]
    fn test_streak_requires_today() {
        let entries = vec![entry("2025-11-13", Emotion::Sad), entry("2025-11-12", Emotion::Sad)];
        assert_eq!(current_streak(&entries, day(TODAY)), 0);
    }

    #[test]
    fn test_streak_stops_at_gap() {
        let entries = vec![
            entry("2025-11-10", Emotion::Happy),
            entry("2025-11-11", Emotion::Happy),
            entry("2025-11-13", Emotion::Happy),
            entry(TODAY, Emotion::Happy),
        ];
        assert_eq!(current_streak(&entries, day(TODAY)), 2);
    }

    #[test]
    fn test_three_happy_days_in_a_row() {
        let entries = vec![
            entry("2025-11-12", Emotion::Happy),
            entry("2025-11-13", Emotion::Happy),
            entry(TODAY, Emotion::Happy),
        ];
        let recap = recap_messages(&entries, day(TODAY));
        assert!(recap.contains(&"You have been happy for 3 days in a row.".to_string()));
    }

    #[test]
    fn test_run_of_one_is_silent() {
        let entries = vec![entry("2025-11-13", Emotion::Sad), entry(TODAY, Emotion::Angry)];
        let recap = recap_messages(&entries, day(TODAY));
        assert!(!recap.iter().any(|m| m.contains("in a row")));
    }

    #[test]
    fn test_run_is_bounded_by_week_window() {
        let entries: Vec<Entry> = (0..10)
            .map(|back| {
                let d = days_before(day(TODAY), back).unwrap();
                entry(&d.format("%Y-%m-%d").to_string(), Emotion::Sad)
            })
            .collect();
        let recap = recap_messages(&entries, day(TODAY));
        assert_eq!(recap[0], "You have been sad for 7 days in a row.");
        assert_eq!(current_streak(&entries, day(TODAY)), 10);
    }

    #[test]
    fn test_weekly_happiness_increase() {
        let entries = vec![
            entry("2025-11-03", Emotion::Happy), // 11 days back
            entry("2025-11-09", Emotion::Happy), // 5 days back
            entry("2025-11-11", Emotion::Happy), // 3 days back
        ];
        let recap = recap_messages(&entries, day(TODAY));
        assert_eq!(recap, vec!["Your happiness increased this week.".to_string()]);
    }

    #[test]
    fn test_weekly_happiness_equal_is_silent() {
        let entries = vec![
            entry("2025-11-01", Emotion::Happy), // 13 days back
            entry("2025-11-08", Emotion::Happy), // 6 days back
        ];
        assert!(recap_messages(&entries, day(TODAY)).is_empty());
    }

    #[test]
    fn test_day_over_day_improved() {
        let entries = vec![entry("2025-11-13", Emotion::Sad), entry(TODAY, Emotion::Happy)];
        let recap = recap_messages(&entries, day(TODAY));
        assert!(recap.contains(
            &"Yesterday your emotion was sad, today it improved to happy.".to_string()
        ));
    }

    #[test]
    fn test_day_over_day_changed_when_rank_not_higher() {
        let entries = vec![entry("2025-11-13", Emotion::Sad), entry(TODAY, Emotion::Angry)];
        assert_eq!(
            recap_messages(&entries, day(TODAY)),
            vec!["Yesterday your emotion was sad, today it changed to angry.".to_string()]
        );

        let entries = vec![entry("2025-11-13", Emotion::Happy), entry(TODAY, Emotion::Sad)];
        let recap = recap_messages(&entries, day(TODAY));
        assert!(recap.contains(
            &"Yesterday your emotion was happy, today it changed to sad.".to_string()
        ));
    }

    #[test]
    fn test_message_order_and_dedup() {
        let entries = vec![
            entry("2025-11-13", Emotion::Happy),
            entry(TODAY, Emotion::Happy),
            entry(TODAY, Emotion::Happy),
        ];
        let insights = Insights::compute(&entries, day(TODAY));
        assert_eq!(insights.streak, 2);
        assert_eq!(
            insights.recap,
            vec![
                "You have been happy for 2 days in a row.".to_string(),
                "Your happiness increased this week.".to_string(),
            ]
        );
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let out = dedup(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(out, vec!["a".to_string(), "b".to_string()]);
    }
}
