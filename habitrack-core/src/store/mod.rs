//! The habit store contract and its in-memory implementation.
//!
//! A store owns the canonical habit collection. Every operation is
//! asynchronous; callers must not assume two in-flight calls against the
//! same id are serialized unless the implementation says so.

mod error;
mod memory;

pub use error::StoreError;
pub use memory::{demo_habits, MemoryHabitStore, DEFAULT_LATENCY};

use crate::models::{Habit, HabitPatch, NewHabit};

/// Asynchronous CRUD and check-in operations over the habit collection.
#[allow(async_fn_in_trait)]
pub trait HabitStore {
    /// All habits, most recently created first.
    async fn get_all(&self) -> Result<Vec<Habit>, StoreError>;

    /// Returns `Ok(None)` when the id is unknown.
    async fn get_by_id(&self, id: &str) -> Result<Option<Habit>, StoreError>;

    /// Inserts a new habit with a fresh id, zero streak and no progress.
    async fn create(&self, data: NewHabit) -> Result<Habit, StoreError>;

    /// Merges `patch` onto the stored habit.
    async fn update(&self, id: &str, patch: HabitPatch) -> Result<Habit, StoreError>;

    /// Removes the habit. Deleting an unknown id is not an error.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Marks today's progress, bumping the streak.
    ///
    /// Fails with [`StoreError::AlreadyCompleted`] when the habit is already
    /// done for today.
    async fn check_in(&self, id: &str) -> Result<Habit, StoreError>;
}
