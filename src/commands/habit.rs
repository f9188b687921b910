use clap::{Args, Subcommand};
use habitrack_core::{
    palette_color, Habit, HabitPatch, HabitSession, HabitStore, NewHabit, MAX_HABITS,
};
use std::io::{self, Write};

use super::OutputFormat;

#[derive(Args)]
pub struct HabitCommand {
    #[command(subcommand)]
    pub command: HabitSubcommand,
}

#[derive(Subcommand)]
pub enum HabitSubcommand {
    /// Create a new habit
    Create {
        /// Name of the habit
        name: String,

        /// What the habit is about
        #[arg(long, short)]
        description: String,

        /// Color token (defaults to the next palette color)
        #[arg(long)]
        color: Option<String>,

        /// Daily repetitions needed to complete the habit
        #[arg(long)]
        target: Option<u32>,
    },

    /// List all habits
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a habit's details
    Show {
        /// Habit ID
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update an existing habit
    Update {
        /// Habit ID
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New description
        #[arg(long, short)]
        description: Option<String>,

        /// New color token
        #[arg(long)]
        color: Option<String>,

        /// New daily target
        #[arg(long)]
        target: Option<u32>,
    },

    /// Delete a habit
    Delete {
        /// Habit ID
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Record today's progress on a habit
    CheckIn {
        /// Habit ID
        id: String,
    },
}

impl HabitCommand {
    pub async fn run<S: HabitStore>(
        &self,
        session: &HabitSession<S>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        session.fetch_all().await?;

        match &self.command {
            HabitSubcommand::Create {
                name,
                description,
                color,
                target,
            } => {
                let count = session.habits().len();
                if count >= MAX_HABITS {
                    return Err(format!("You can track at most {} habits", MAX_HABITS).into());
                }

                let color = color
                    .clone()
                    .unwrap_or_else(|| palette_color(count).to_string());
                let mut data = NewHabit::new(name, description, color);
                data.target_count = *target;
                let data = data.validate()?;

                let created = session.create(data).await?;
                println!("Created habit:");
                println!("{}", created);
                Ok(())
            }

            HabitSubcommand::List { format } => {
                let habits = session.habits();

                if habits.is_empty() {
                    println!("No habits yet. Create one with 'habitrack habit create'.");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&habits)?);
                    }
                    OutputFormat::Text => print_table(&habits),
                }
                Ok(())
            }

            HabitSubcommand::Show { id, format } => match session.habit(id) {
                Some(habit) => {
                    match format {
                        OutputFormat::Json => {
                            println!("{}", serde_json::to_string_pretty(&habit)?);
                        }
                        OutputFormat::Text => {
                            println!("{}", habit);
                        }
                    }
                    Ok(())
                }
                None => Err(format!("Habit not found: {}", id).into()),
            },

            HabitSubcommand::Update {
                id,
                name,
                description,
                color,
                target,
            } => {
                let patch = build_patch(name, description, color, *target)?;
                if patch.is_empty() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let updated = session.update(id, patch).await?;
                println!("Updated habit:");
                println!("{}", updated);
                Ok(())
            }

            HabitSubcommand::Delete { id, force } => {
                let habit = match session.habit(id) {
                    Some(h) => h,
                    None => return Err(format!("Habit not found: {}", id).into()),
                };

                if !force {
                    print!("Delete habit '{}'? [y/N] ", habit.name);
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }

                session.delete(id).await?;
                println!("Deleted habit: {}", habit.name);
                Ok(())
            }

            HabitSubcommand::CheckIn { id } => {
                let habit = session.check_in(id).await?;
                println!("Another step forward on your journey!");
                println!(
                    "{}: {}/{} today, {} day streak",
                    habit.name,
                    habit.completed(),
                    habit.target(),
                    habit.streak
                );
                Ok(())
            }
        }
    }
}

/// Turns update flags into a patch, rejecting blank text and a zero target.
fn build_patch(
    name: &Option<String>,
    description: &Option<String>,
    color: &Option<String>,
    target: Option<u32>,
) -> Result<HabitPatch, String> {
    let text = |field: &str, value: &Option<String>| -> Result<Option<String>, String> {
        match value.as_deref().map(str::trim) {
            Some("") => Err(format!("{} cannot be empty", field)),
            other => Ok(other.map(str::to_string)),
        }
    };

    if target == Some(0) {
        return Err("Target must be at least 1".to_string());
    }

    Ok(HabitPatch {
        name: text("Name", name)?,
        description: text("Description", description)?,
        color: text("Color", color)?,
        target_count: target,
        ..HabitPatch::default()
    })
}

fn print_table(habits: &[Habit]) {
    println!(
        "{:<36}  {:<24}  {:>6}  {:>7}  DONE",
        "ID", "NAME", "STREAK", "TODAY"
    );
    println!("{}", "-".repeat(86));
    for habit in habits {
        let name = if habit.name.chars().count() > 24 {
            format!("{}...", habit.name.chars().take(21).collect::<String>())
        } else {
            habit.name.clone()
        };
        let today = format!("{}/{}", habit.completed(), habit.target());
        let done = if habit.completed_today { "yes" } else { "" };
        println!(
            "{:<36}  {:<24}  {:>6}  {:>7}  {}",
            habit.id, name, habit.streak, today, done
        );
    }
    println!("\nTotal: {} habit(s)", habits.len());
}
