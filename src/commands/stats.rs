use chrono::{Local, Timelike};
use clap::Args;
use habitrack_core::{Habit, HabitSession, HabitStore};
use serde_json::json;

use super::OutputFormat;

/// How many habits the performance list shows.
const TOP_HABITS: usize = 5;

/// Show today's progress and streak statistics
#[derive(Args)]
pub struct StatsCommand {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl StatsCommand {
    pub async fn run<S: HabitStore>(
        &self,
        session: &HabitSession<S>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        session.fetch_all().await?;
        let habits = session.habits();
        let summary = session.summary();
        let top = top_by_streak(&habits, TOP_HABITS);

        match self.format {
            OutputFormat::Json => {
                let performance: Vec<_> = top
                    .iter()
                    .map(|h| {
                        json!({
                            "id": h.id,
                            "name": h.name,
                            "streak": h.streak,
                            "completedCount": h.completed(),
                            "targetCount": h.target(),
                            "progressPercent": h.progress_percent(),
                        })
                    })
                    .collect();
                let output = json!({ "summary": summary, "habits": performance });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                let now = Local::now();
                println!("{}!", greeting(now.hour()));
                println!("{}\n", now.format("%A, %B %-d"));
                print!("{}", summary);
                println!("\n{}", motivation(summary.completion_rate));

                if !top.is_empty() {
                    println!("\nHabit performance:");
                    for habit in &top {
                        println!(
                            "  {:<24} {:>4} day streak {:>4}%",
                            habit.name,
                            habit.streak,
                            habit.progress_percent()
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

/// The `limit` habits with the longest streaks, longest first.
/// Equal streaks keep their cache order.
fn top_by_streak(habits: &[Habit], limit: usize) -> Vec<&Habit> {
    let mut sorted: Vec<&Habit> = habits.iter().collect();
    sorted.sort_by(|a, b| b.streak.cmp(&a.streak));
    sorted.truncate(limit);
    sorted
}

fn greeting(hour: u32) -> &'static str {
    match hour {
        0..=11 => "Good morning",
        12..=16 => "Good afternoon",
        _ => "Good evening",
    }
}

fn motivation(completion_rate: u32) -> &'static str {
    match completion_rate {
        100.. => "You're crushing it today!",
        75..=99 => "Almost there, keep going!",
        50..=74 => "You're halfway there!",
        1..=49 => "Great start, let's keep building!",
        0 => "Ready to start your day?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn habit(id: &str, streak: u32) -> Habit {
        Habit {
            id: id.to_string(),
            name: format!("Habit {}", id),
            description: String::new(),
            color: "#000000".to_string(),
            streak,
            completed_today: false,
            created_at: "2024-01-01".to_string(),
            target_count: None,
            completed_count: Some(0),
        }
    }

    #[test]
    fn test_top_by_streak_orders_and_caps() {
        let habits = vec![
            habit("a", 2),
            habit("b", 9),
            habit("c", 0),
            habit("d", 5),
            habit("e", 5),
            habit("f", 7),
        ];

        let ids: Vec<&str> = top_by_streak(&habits, TOP_HABITS)
            .into_iter()
            .map(|h| h.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "f", "d", "e", "a"]);
    }

    #[test]
    fn test_top_by_streak_short_list() {
        let habits = vec![habit("a", 1), habit("b", 3)];
        let top = top_by_streak(&habits, TOP_HABITS);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, "b");
        assert!(top_by_streak(&[], TOP_HABITS).is_empty());
    }

    #[test]
    fn test_greeting_boundaries() {
        assert_eq!(greeting(0), "Good morning");
        assert_eq!(greeting(11), "Good morning");
        assert_eq!(greeting(12), "Good afternoon");
        assert_eq!(greeting(16), "Good afternoon");
        assert_eq!(greeting(17), "Good evening");
    }

    #[test]
    fn test_motivation_thresholds() {
        assert_eq!(motivation(100), "You're crushing it today!");
        assert_eq!(motivation(75), "Almost there, keep going!");
        assert_eq!(motivation(50), "You're halfway there!");
        assert_eq!(motivation(1), "Great start, let's keep building!");
        assert_eq!(motivation(0), "Ready to start your day?");
    }
}
