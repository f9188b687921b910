//! In-process habit store with simulated network latency.

use std::time::Duration;
use tokio::sync::Mutex;

use super::{HabitStore, StoreError};
use crate::models::{Habit, HabitPatch, NewHabit};

/// Round-trip delay applied before every operation unless overridden.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(800);

/// Habit store that keeps its collection in memory.
///
/// Each operation sleeps for the configured latency before touching the
/// collection. Check-ins are not serialized per habit: two concurrent
/// check-ins can both see `completed_today == false` and both succeed.
pub struct MemoryHabitStore {
    habits: Mutex<Vec<Habit>>,
    latency: Duration,
}

impl MemoryHabitStore {
    /// Creates an empty store with the default latency.
    pub fn new() -> Self {
        Self::with_habits(Vec::new())
    }

    /// Creates a store holding `habits`, in the given order.
    pub fn with_habits(habits: Vec<Habit>) -> Self {
        Self {
            habits: Mutex::new(habits),
            latency: DEFAULT_LATENCY,
        }
    }

    /// Creates a store seeded with [`demo_habits`].
    pub fn with_demo_habits() -> Self {
        Self::with_habits(demo_habits())
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    async fn round_trip(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for MemoryHabitStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HabitStore for MemoryHabitStore {
    async fn get_all(&self) -> Result<Vec<Habit>, StoreError> {
        self.round_trip().await;
        Ok(self.habits.lock().await.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Habit>, StoreError> {
        self.round_trip().await;
        let habits = self.habits.lock().await;
        Ok(habits.iter().find(|h| h.id == id).cloned())
    }

    async fn create(&self, data: NewHabit) -> Result<Habit, StoreError> {
        self.round_trip().await;
        let habit = Habit::from_new(data);
        self.habits.lock().await.insert(0, habit.clone());
        tracing::debug!(id = %habit.id, "created habit");
        Ok(habit)
    }

    async fn update(&self, id: &str, patch: HabitPatch) -> Result<Habit, StoreError> {
        self.round_trip().await;
        let mut habits = self.habits.lock().await;
        let habit = habits
            .iter_mut()
            .find(|h| h.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        habit.apply(&patch);
        tracing::debug!(id, "updated habit");
        Ok(habit.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.round_trip().await;
        let mut habits = self.habits.lock().await;
        if let Some(index) = habits.iter().position(|h| h.id == id) {
            habits.remove(index);
            tracing::debug!(id, "deleted habit");
        }
        Ok(())
    }

    async fn check_in(&self, id: &str) -> Result<Habit, StoreError> {
        self.round_trip().await;
        let habit = self
            .habits
            .lock()
            .await
            .iter()
            .find(|h| h.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if habit.completed_today {
            return Err(StoreError::AlreadyCompleted(id.to_string()));
        }

        // Goes through update, which waits another round trip before writing.
        self.update(id, habit.check_in_patch()).await
    }
}

/// The four habits a fresh demo store starts with.
pub fn demo_habits() -> Vec<Habit> {
    let habit = |id: &str,
                 name: &str,
                 description: &str,
                 color: &str,
                 streak: u32,
                 completed_today: bool,
                 target_count: u32,
                 completed_count: u32| Habit {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        color: color.to_string(),
        streak,
        completed_today,
        created_at: format!("2024-01-0{}", id),
        target_count: Some(target_count),
        completed_count: Some(completed_count),
    };

    vec![
        habit("1", "Drink Water", "8 glasses per day", "#3B82F6", 5, false, 8, 3),
        habit("2", "Exercise", "30 minutes daily workout", "#10B981", 3, true, 1, 1),
        habit("3", "Read Books", "Read for 20 minutes", "#8B5CF6", 7, false, 1, 0),
        habit("4", "Meditate", "10 minutes mindfulness", "#F59E0B", 2, true, 1, 1),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_store() -> MemoryHabitStore {
        MemoryHabitStore::with_demo_habits()
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_all_returns_seed_order() {
        let store = demo_store();
        let habits = store.get_all().await.unwrap();

        let ids: Vec<&str> = habits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_operations_wait_for_latency() {
        let store = demo_store();
        let start = tokio::time::Instant::now();

        store.get_all().await.unwrap();

        assert!(start.elapsed() >= DEFAULT_LATENCY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_by_id_missing_is_none() {
        let store = demo_store();
        assert!(store.get_by_id("999").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_prepends_fresh_habit() {
        let store = demo_store();
        let created = store
            .create(NewHabit::new("Journal", "One page", "#A67C52").with_target_count(2))
            .await
            .unwrap();

        assert_eq!(created.streak, 0);
        assert!(!created.completed_today);
        assert_eq!(created.completed_count, Some(0));
        assert_eq!(created.target_count, Some(2));

        let habits = store.get_all().await.unwrap();
        assert_eq!(habits.len(), 5);
        assert_eq!(habits[0].id, created.id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_then_get_by_id() {
        let store = MemoryHabitStore::new();
        let created = store
            .create(NewHabit::new("Walk", "10k steps", "#059669"))
            .await
            .unwrap();

        let fetched = store.get_by_id(&created.id).await.unwrap();
        assert_eq!(fetched, Some(created));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_merges_fields() {
        let store = demo_store();
        let updated = store
            .update("3", HabitPatch::default().with_name("Read Novels"))
            .await
            .unwrap();

        assert_eq!(updated.name, "Read Novels");
        assert_eq!(updated.description, "Read for 20 minutes");
        assert_eq!(updated.streak, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_missing_is_not_found() {
        let store = demo_store();
        let result = store
            .update("999", HabitPatch::default().with_name("x"))
            .await;

        assert_eq!(result, Err(StoreError::NotFound("999".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_is_idempotent() {
        let store = demo_store();

        store.delete("2").await.unwrap();
        store.delete("2").await.unwrap();

        let habits = store.get_all().await.unwrap();
        assert_eq!(habits.len(), 3);
        assert!(habits.iter().all(|h| h.id != "2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_in_scenario() {
        let store = demo_store();
        let habit = store.check_in("1").await.unwrap();

        assert_eq!(habit.streak, 6);
        assert!(habit.completed_today);
        assert_eq!(habit.completed_count, Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_check_in_is_rejected() {
        let store = demo_store();
        store.check_in("3").await.unwrap();

        let result = store.check_in("3").await;
        assert_eq!(result, Err(StoreError::AlreadyCompleted("3".to_string())));

        let habit = store.get_by_id("3").await.unwrap().unwrap();
        assert_eq!(habit.streak, 8);
        assert_eq!(habit.completed_count, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_in_missing_is_not_found() {
        let store = demo_store();
        let result = store.check_in("999").await;
        assert_eq!(result, Err(StoreError::NotFound("999".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_check_ins_both_pass() {
        let store = demo_store();

        let (a, b) = tokio::join!(store.check_in("1"), store.check_in("1"));

        // Both read completed_today == false before either wrote.
        let a = a.unwrap();
        let b = b.unwrap();
        assert_eq!(a.streak, 6);
        assert_eq!(b.streak, 6);
        assert_eq!(b.completed_count, Some(4));
    }

    #[tokio::test]
    async fn test_zero_latency() {
        let store = MemoryHabitStore::with_demo_habits().with_latency(Duration::ZERO);
        assert_eq!(store.latency(), Duration::ZERO);
        assert_eq!(store.get_all().await.unwrap().len(), 4);
    }
}
