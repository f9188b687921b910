mod habit;
mod new_habit;
mod palette;
mod summary;

pub use habit::{Habit, HabitPatch};
pub use new_habit::{NewHabit, ValidationError};
pub use palette::{palette_color, HABIT_COLORS, MAX_HABITS};
pub use summary::HabitSummary;
