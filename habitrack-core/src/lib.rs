//! habitrack core library
//!
//! The habit model, the asynchronous store contract with an in-memory
//! implementation, and the optimistic client session built on top of it.

pub mod models;
pub mod session;
pub mod store;

pub use models::{
    palette_color, Habit, HabitPatch, HabitSummary, NewHabit, ValidationError, HABIT_COLORS,
    MAX_HABITS,
};
pub use session::{HabitSession, SessionSnapshot};
pub use store::{demo_habits, HabitStore, MemoryHabitStore, StoreError, DEFAULT_LATENCY};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
