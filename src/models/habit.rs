// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Habit tracking and the star tally earned by completing habits.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A single tracked habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Habit {
    /// Time-derived identifier (milliseconds), unique within the list
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub text: String,
    pub completed: bool,
}

/// Ordered habit list for one identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitList(Vec<Habit>);

impl HabitList {
    pub fn new(habits: Vec<Habit>) -> Self {
        Self(habits)
    }

    pub fn as_slice(&self) -> &[Habit] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn completed_count(&self) -> usize {
        self.0.iter().filter(|h| h.completed).count()
    }

    /// Add a habit. Blank text is ignored.
    ///
    /// The id is `now_ms`, bumped past the largest existing id so two habits
    /// added within the same millisecond never collide.
    pub fn add(&mut self, text: &str, now_ms: u64) -> Option<&Habit> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let next_free = self.0.iter().map(|h| h.id + 1).max().unwrap_or(0);
        self.0.push(Habit {
            id: now_ms.max(next_free),
            text: text.to_string(),
            completed: false,
        });
        self.0.last()
    }

    /// Flip completion and return the star adjustment (+1 or -1).
    pub fn toggle(&mut self, id: u64) -> Option<i32> {
        let habit = self.0.iter_mut().find(|h| h.id == id)?;
        habit.completed = !habit.completed;
        Some(if habit.completed { 1 } else { -1 })
    }

    /// Remove a habit. Stars earned by it are kept.
    pub fn remove(&mut self, id: u64) -> Option<Habit> {
        let index = self.0.iter().position(|h| h.id == id)?;
        Some(self.0.remove(index))
    }
}

/// Non-negative star count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StarTally(u32);

impl StarTally {
    pub fn new(stars: u32) -> Self {
        Self(stars)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Apply a toggle adjustment, flooring at zero.
    pub fn apply(&mut self, delta: i32) {
        self.0 = if delta >= 0 {
            self.0.saturating_add(delta.unsigned_abs())
        } else {
            self.0.saturating_sub(delta.unsigned_abs())
        };
    }
}
