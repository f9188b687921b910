use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::new_habit::NewHabit;

/// A trackable daily habit with a running streak.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub description: String,
    pub color: String,
    pub streak: u32,
    pub completed_today: bool,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_count: Option<u32>,
}

/// Partial update for a habit. `None` fields are left untouched.
///
/// There is no way to change `id` or `created_at` through a patch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct HabitPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_today: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_count: Option<u32>,
}

impl Habit {
    /// Builds a fresh record for `data` with a new id and the current time.
    pub fn from_new(data: NewHabit) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: data.name,
            description: data.description,
            color: data.color,
            streak: 0,
            completed_today: false,
            created_at: Utc::now().to_rfc3339(),
            target_count: data.target_count,
            completed_count: Some(0),
        }
    }

    /// Daily target, defaulting to 1 when unset.
    pub fn target(&self) -> u32 {
        self.target_count.unwrap_or(1).max(1)
    }

    pub fn completed(&self) -> u32 {
        self.completed_count.unwrap_or(0)
    }

    /// Today's progress toward the target, rounded to a whole percent.
    pub fn progress_percent(&self) -> u32 {
        let target = u64::from(self.target());
        let completed = u64::from(self.completed()).min(target);
        ((completed * 100 + target / 2) / target) as u32
    }

    /// The fields a successful check-in writes.
    ///
    /// Values are absolute, computed from this record: the caller does not
    /// need to re-read the habit to apply them.
    pub fn check_in_patch(&self) -> HabitPatch {
        HabitPatch {
            completed_today: Some(true),
            completed_count: Some(self.completed().saturating_add(1).min(self.target())),
            streak: Some(self.streak.saturating_add(1)),
            ..HabitPatch::default()
        }
    }

    /// Shallow merge of `patch` onto this record.
    ///
    /// Keeps `completed_count <= target`, `completed_today` implying at
    /// least one completion, and a streak that never moves backwards.
    pub fn apply(&mut self, patch: &HabitPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
        if let Some(streak) = patch.streak {
            self.streak = self.streak.max(streak);
        }
        if let Some(completed_today) = patch.completed_today {
            self.completed_today = completed_today;
        }
        if let Some(target_count) = patch.target_count {
            self.target_count = Some(target_count.max(1));
        }
        if let Some(completed_count) = patch.completed_count {
            self.completed_count = Some(completed_count);
        }

        let target = self.target();
        if self.completed() > target {
            self.completed_count = Some(target);
        }
        if self.completed_today && self.completed() == 0 {
            self.completed_count = Some(1);
        }
    }

    /// Returns a copy with `patch` applied.
    pub fn merged(&self, patch: &HabitPatch) -> Self {
        let mut habit = self.clone();
        habit.apply(patch);
        habit
    }
}

impl HabitPatch {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_target_count(mut self, target_count: u32) -> Self {
        self.target_count = Some(target_count);
        self
    }

    pub fn with_completed_count(mut self, completed_count: u32) -> Self {
        self.completed_count = Some(completed_count);
        self
    }

    pub fn with_completed_today(mut self, completed_today: bool) -> Self {
        self.completed_today = Some(completed_today);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl fmt::Display for Habit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.chars().count()))?;
        writeln!(f, "{}", self.description)?;
        writeln!(f)?;
        writeln!(f, "ID: {}", self.id)?;
        writeln!(f, "Color: {}", self.color)?;
        writeln!(f, "Streak: {} day(s)", self.streak)?;
        writeln!(
            f,
            "Today: {}/{} ({}%){}",
            self.completed(),
            self.target(),
            self.progress_percent(),
            if self.completed_today { " - done" } else { "" }
        )?;
        writeln!(f, "Created: {}", self.created_at)?;
        Ok(())
    }
}
