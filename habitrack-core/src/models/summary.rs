use serde::Serialize;
use std::fmt;

use super::habit::Habit;

/// Aggregate numbers for a set of habits.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HabitSummary {
    pub total_habits: usize,
    pub completed_today: usize,
    /// Percent of habits completed today, rounded.
    pub completion_rate: u32,
    pub total_streak: u64,
    /// Mean streak, rounded.
    pub average_streak: u32,
    pub longest_streak: u32,
}

impl HabitSummary {
    pub fn from_habits(habits: &[Habit]) -> Self {
        let total_habits = habits.len();
        if total_habits == 0 {
            return Self::default();
        }

        let completed_today = habits.iter().filter(|h| h.completed_today).count();
        let total_streak: u64 = habits.iter().map(|h| u64::from(h.streak)).sum();
        let longest_streak = habits.iter().map(|h| h.streak).max().unwrap_or(0);

        Self {
            total_habits,
            completed_today,
            completion_rate: rounded_ratio(completed_today as u64 * 100, total_habits as u64),
            total_streak,
            average_streak: rounded_ratio(total_streak, total_habits as u64),
            longest_streak,
        }
    }
}

fn rounded_ratio(numerator: u64, denominator: u64) -> u32 {
    ((numerator + denominator / 2) / denominator) as u32
}

impl fmt::Display for HabitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Active habits:   {}", self.total_habits)?;
        writeln!(
            f,
            "Completed today: {} ({}%)",
            self.completed_today, self.completion_rate
        )?;
        writeln!(f, "Average streak:  {} day(s)", self.average_streak)?;
        writeln!(f, "Longest streak:  {} day(s)", self.longest_streak)?;
        Ok(())
    }
}
