mod config_cmd;
mod habit;
mod stats;

pub use config_cmd::ConfigCommand;
pub use habit::HabitCommand;
pub use stats::StatsCommand;

use clap::ValueEnum;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
