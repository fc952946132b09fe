//! Trend series for the dashboard chart.
//!
//! The chart widget itself lives in the client. This module only shapes the
//! entry history into per-emotion series keyed by date, tracks which
//! emotion is highlighted, and keeps the diary text for each date so the
//! tooltip can show it.

use crate::emotion::Emotion;
use crate::entry::Entry;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

pub const NO_DIARY: &str = "(no diary recorded)";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendDataset {
    pub emotion: Emotion,
    /// Face score per date as a percentage, two decimals.
    pub values: Vec<f64>,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub dates: Vec<NaiveDate>,
    pub datasets: Vec<TrendDataset>,
    pub highlight: Option<Emotion>,
    #[serde(skip)]
    diaries: BTreeMap<NaiveDate, String>,
}

impl TrendSeries {
    pub fn build(entries: &[Entry], highlight: Option<Emotion>) -> Self {
        let rows: BTreeMap<NaiveDate, &Entry> = entries.iter().map(|e| (e.date, e)).collect();
        let dates: Vec<NaiveDate> = rows.keys().copied().collect();

        let datasets = Emotion::ALL
            .iter()
            .map(|&emotion| TrendDataset {
                emotion,
                values: rows.values().map(|e| percent(e.face.get(emotion))).collect(),
                highlighted: highlight.map_or(true, |h| h == emotion),
            })
            .collect();

        let diaries = rows
            .iter()
            .map(|(date, e)| (*date, e.diary.clone()))
            .collect();

        Self {
            dates,
            datasets,
            highlight,
            diaries,
        }
    }

    /// Diary text to show for a rendered date.
    pub fn diary_for(&self, date: NaiveDate) -> &str {
        match self.diaries.get(&date) {
            Some(d) if !d.is_empty() => d,
            _ => NO_DIARY,
        }
    }

    pub fn dataset(&self, emotion: Emotion) -> Option<&TrendDataset> {
        self.datasets.iter().find(|d| d.emotion == emotion)
    }

    /// Legend click: selecting the highlighted emotion again clears the filter.
    pub fn toggle_highlight(&mut self, emotion: Emotion) {
        self.highlight = if self.highlight == Some(emotion) {
            None
        } else {
            Some(emotion)
        };
        for ds in &mut self.datasets {
            ds.highlighted = self.highlight.map_or(true, |h| h == ds.emotion);
        }
    }
}

fn percent(score: f64) -> f64 {
    (score * 100.0 * 100.0).round() / 100.0
}
