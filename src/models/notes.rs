// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Per-day notes shown on the dashboard calendar.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::time_utils::format_date_key;

/// Notes keyed by ISO date (`YYYY-MM-DD`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DailyNotes(BTreeMap<String, String>);

impl DailyNotes {
    pub fn new(notes: BTreeMap<String, String>) -> Self {
        Self(notes)
    }

    pub fn get(&self, date: NaiveDate) -> Option<&str> {
        self.0.get(&format_date_key(date)).map(String::as_str)
    }

    /// Store a note for a date. Blank text removes the note.
    pub fn set(&mut self, date: NaiveDate, text: &str) {
        let key = format_date_key(date);
        if text.trim().is_empty() {
            self.0.remove(&key);
        } else {
            self.0.insert(key, text.to_string());
        }
    }

    /// Notes falling in the given calendar month.
    pub fn for_month(&self, year: i32, month: u32) -> BTreeMap<String, String> {
        self.0
            .iter()
            .filter(|(key, _)| {
                NaiveDate::parse_from_str(key, "%Y-%m-%d")
                    .map(|d| d.year() == year && d.month() == month)
                    .unwrap_or(false)
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
