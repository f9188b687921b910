//! Client-side habit cache with optimistic mutations.
//!
//! A [`HabitSession`] mirrors a [`HabitStore`] for a front end. Mutations
//! are applied to the cache before the store call is issued and reconciled
//! with the store's answer afterwards. When a mutation fails the whole
//! cache is refetched from the store, the failure message is recorded in
//! [`HabitSession::error`], and the error is returned to the caller.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::models::{Habit, HabitPatch, HabitSummary, NewHabit};
use crate::store::{HabitStore, StoreError};

/// Everything a front end renders from a session.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub habits: Vec<Habit>,
    /// True until the first fetch settles.
    pub loading: bool,
    pub refreshing: bool,
    pub error: Option<String>,
}

impl SessionSnapshot {
    fn find_mut(&mut self, id: &str) -> Option<&mut Habit> {
        self.habits.iter_mut().find(|h| h.id == id)
    }
}

pub struct HabitSession<S> {
    store: S,
    state: Mutex<SessionSnapshot>,
    live: AtomicBool,
}

impl<S: HabitStore> HabitSession<S> {
    /// Creates a session with an empty cache. Call [`fetch_all`] to load it.
    ///
    /// [`fetch_all`]: HabitSession::fetch_all
    pub fn new(store: S) -> Self {
        Self {
            store,
            state: Mutex::new(SessionSnapshot {
                habits: Vec::new(),
                loading: true,
                refreshing: false,
                error: None,
            }),
            live: AtomicBool::new(true),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn habits(&self) -> Vec<Habit> {
        self.lock().habits.clone()
    }

    pub fn habit(&self, id: &str) -> Option<Habit> {
        self.lock().habits.iter().find(|h| h.id == id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    /// Message of the most recent failure, cleared when a new attempt starts.
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().clone()
    }

    pub fn summary(&self) -> HabitSummary {
        HabitSummary::from_habits(&self.lock().habits)
    }

    /// Detaches the session from its owner.
    ///
    /// Operations still in flight return their results, but no longer
    /// touch the cache, flags or error.
    pub fn close(&self) {
        self.live.store(false, Ordering::Release);
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Replaces the cache with the store's full collection.
    ///
    /// On failure the cache is left as it was and the message is recorded.
    pub async fn fetch_all(&self) -> Result<(), StoreError> {
        self.mutate(|state| state.error = None);

        match self.store.get_all().await {
            Ok(habits) => {
                tracing::debug!(count = habits.len(), "fetched habits");
                self.mutate(move |state| {
                    state.habits = habits;
                    state.loading = false;
                });
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to fetch habits: {}", e);
                self.mutate(|state| {
                    state.error = Some(e.to_string());
                    state.loading = false;
                });
                Err(e)
            }
        }
    }

    /// [`fetch_all`](HabitSession::fetch_all) with the refreshing flag
    /// raised for its duration.
    pub async fn refresh(&self) -> Result<(), StoreError> {
        self.mutate(|state| state.refreshing = true);
        let _refreshing = RefreshingFlag(self);
        self.fetch_all().await
    }

    /// Creates a habit and puts it at the head of the cache.
    ///
    /// Nothing is inserted before the store answers since the id is
    /// assigned by the store.
    pub async fn create(&self, data: NewHabit) -> Result<Habit, StoreError> {
        self.mutate(|state| state.error = None);

        match self.store.create(data).await {
            Ok(habit) => {
                let cached = habit.clone();
                self.mutate(move |state| state.habits.insert(0, cached));
                Ok(habit)
            }
            Err(e) => {
                tracing::warn!("Failed to create habit: {}", e);
                self.mutate(|state| state.error = Some(e.to_string()));
                Err(e)
            }
        }
    }

    pub async fn update(&self, id: &str, patch: HabitPatch) -> Result<Habit, StoreError> {
        self.mutate(|state| {
            state.error = None;
            if let Some(habit) = state.find_mut(id) {
                habit.apply(&patch);
            }
        });

        match self.store.update(id, patch).await {
            Ok(habit) => {
                self.reconcile(&habit);
                Ok(habit)
            }
            Err(e) => {
                self.resync_after(&e).await;
                Err(e)
            }
        }
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.mutate(|state| {
            state.error = None;
            state.habits.retain(|h| h.id != id);
        });

        match self.store.delete(id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.resync_after(&e).await;
                Err(e)
            }
        }
    }

    pub async fn check_in(&self, id: &str) -> Result<Habit, StoreError> {
        self.mutate(|state| {
            state.error = None;
            if let Some(habit) = state.find_mut(id) {
                let patch = habit.check_in_patch();
                habit.apply(&patch);
            }
        });

        match self.store.check_in(id).await {
            Ok(habit) => {
                self.reconcile(&habit);
                Ok(habit)
            }
            Err(e) => {
                self.resync_after(&e).await;
                Err(e)
            }
        }
    }

    fn reconcile(&self, habit: &Habit) {
        self.mutate(|state| {
            if let Some(cached) = state.find_mut(&habit.id) {
                *cached = habit.clone();
            }
        });
    }

    /// Drops optimistic changes by refetching, then records `error`.
    async fn resync_after(&self, error: &StoreError) {
        tracing::warn!("Mutation failed, resynchronizing: {}", error);
        if let Err(e) = self.fetch_all().await {
            tracing::warn!("Resynchronization failed: {}", e);
        }
        self.mutate(|state| state.error = Some(error.to_string()));
    }

    fn mutate(&self, f: impl FnOnce(&mut SessionSnapshot)) {
        if !self.is_live() {
            return;
        }
        f(&mut *self.lock());
    }
}

impl<S> HabitSession<S> {
    fn lock(&self) -> MutexGuard<'_, SessionSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Lowers the refreshing flag when dropped, whether the fetch succeeded,
/// failed, or was abandoned.
struct RefreshingFlag<'a, S>(&'a HabitSession<S>);

impl<S> Drop for RefreshingFlag<'_, S> {
    fn drop(&mut self) {
        if self.0.live.load(Ordering::Acquire) {
            self.0.lock().refreshing = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryHabitStore, DEFAULT_LATENCY};
    use std::collections::HashSet;
    use tokio::time::Instant;

    /// Demo store whose operations can be made to fail on demand.
    struct FlakyStore {
        inner: MemoryHabitStore,
        failing: Mutex<HashSet<&'static str>>,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: MemoryHabitStore::with_demo_habits(),
                failing: Mutex::new(HashSet::new()),
            }
        }

        fn fail(&self, op: &'static str) {
            self.failing.lock().unwrap().insert(op);
        }

        fn heal(&self, op: &'static str) {
            self.failing.lock().unwrap().remove(op);
        }

        async fn gate(&self, op: &'static str) -> Result<(), StoreError> {
            if self.failing.lock().unwrap().contains(op) {
                tokio::time::sleep(DEFAULT_LATENCY).await;
                return Err(StoreError::Transport(format!("{} timed out", op)));
            }
            Ok(())
        }
    }

    impl HabitStore for FlakyStore {
        async fn get_all(&self) -> Result<Vec<Habit>, StoreError> {
            self.gate("get_all").await?;
            self.inner.get_all().await
        }

        async fn get_by_id(&self, id: &str) -> Result<Option<Habit>, StoreError> {
            self.gate("get_by_id").await?;
            self.inner.get_by_id(id).await
        }

        async fn create(&self, data: NewHabit) -> Result<Habit, StoreError> {
            self.gate("create").await?;
            self.inner.create(data).await
        }

        async fn update(&self, id: &str, patch: HabitPatch) -> Result<Habit, StoreError> {
            self.gate("update").await?;
            self.inner.update(id, patch).await
        }

        async fn delete(&self, id: &str) -> Result<(), StoreError> {
            self.gate("delete").await?;
            self.inner.delete(id).await
        }

        async fn check_in(&self, id: &str) -> Result<Habit, StoreError> {
            self.gate("check_in").await?;
            self.inner.check_in(id).await
        }
    }

    async fn loaded_session() -> HabitSession<FlakyStore> {
        let session = HabitSession::new(FlakyStore::new());
        session.fetch_all().await.unwrap();
        session
    }

    fn ids(session: &HabitSession<FlakyStore>) -> Vec<String> {
        session.habits().into_iter().map(|h| h.id).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_all_loads_cache() {
        let session = HabitSession::new(FlakyStore::new());
        assert!(session.is_loading());
        assert!(session.habits().is_empty());

        session.fetch_all().await.unwrap();

        assert!(!session.is_loading());
        assert_eq!(ids(&session), vec!["1", "2", "3", "4"]);
        assert!(session.error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_keeps_cache() {
        let session = loaded_session().await;
        session.store().fail("get_all");

        let result = session.fetch_all().await;

        assert!(matches!(result, Err(StoreError::Transport(_))));
        assert_eq!(session.habits().len(), 4);
        assert!(session.error().unwrap().contains("get_all timed out"));
        assert!(!session.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fetch_failure_clears_loading() {
        let session = HabitSession::new(FlakyStore::new());
        session.store().fail("get_all");

        assert!(session.fetch_all().await.is_err());
        assert!(!session.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_flag_lifecycle() {
        let session = loaded_session().await;

        let (result, during) = tokio::join!(session.refresh(), async {
            session.is_refreshing()
        });

        assert!(result.is_ok());
        assert!(during);
        assert!(!session.is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_clears_flag_on_failure() {
        let session = loaded_session().await;
        session.store().fail("get_all");

        assert!(session.refresh().await.is_err());
        assert!(!session.is_refreshing());
        assert!(session.error().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_prepends_to_cache() {
        let session = loaded_session().await;

        let habit = session
            .create(NewHabit::new("Journal", "One page", "#A67C52"))
            .await
            .unwrap();

        assert_eq!(habit.streak, 0);
        assert!(!habit.completed_today);
        assert_eq!(habit.completed_count, Some(0));
        assert_eq!(session.habits()[0], habit);
        assert_eq!(session.habits().len(), 5);

        let stored = session.store().get_by_id(&habit.id).await.unwrap();
        assert_eq!(stored, Some(habit));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_failure_propagates() {
        let session = loaded_session().await;
        session.store().fail("create");

        let result = session
            .create(NewHabit::new("Journal", "One page", "#A67C52"))
            .await;

        assert!(result.is_err());
        assert_eq!(session.habits().len(), 4);
        assert!(session.error().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_is_optimistic_then_reconciled() {
        let session = loaded_session().await;
        let start = Instant::now();

        let (result, during) = tokio::join!(
            session.update("3", HabitPatch::default().with_name("Read Novels")),
            async { (session.habit("3").unwrap().name, start.elapsed()) }
        );

        let (name_during, elapsed) = during;
        assert_eq!(name_during, "Read Novels");
        assert!(elapsed < DEFAULT_LATENCY);

        let updated = result.unwrap();
        assert_eq!(session.habit("3"), Some(updated));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_missing_is_not_found() {
        let session = loaded_session().await;
        let before = session.habits();

        let result = session
            .update("999", HabitPatch::default().with_name("x"))
            .await;

        assert_eq!(result, Err(StoreError::NotFound("999".to_string())));
        assert_eq!(session.habits(), before);
        let error = session.error().unwrap();
        assert!(!error.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_failure_reverts_optimistic_merge() {
        let session = loaded_session().await;
        session.store().fail("update");

        let result = session
            .update("3", HabitPatch::default().with_name("Read Novels"))
            .await;

        assert!(result.is_err());
        assert_eq!(session.habit("3").unwrap().name, "Read Books");
        assert!(session.error().unwrap().contains("update timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_is_optimistic() {
        let session = loaded_session().await;
        let start = Instant::now();

        let (result, during) = tokio::join!(session.delete("2"), async {
            (session.habit("2").is_none(), start.elapsed())
        });

        let (gone_during, elapsed) = during;
        assert!(gone_during);
        assert!(elapsed < DEFAULT_LATENCY);
        assert!(result.is_ok());
        assert_eq!(ids(&session), vec!["1", "3", "4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_failure_restores_habit() {
        let session = loaded_session().await;
        session.store().fail("delete");

        let (result, gone_during) =
            tokio::join!(session.delete("2"), async { session.habit("2").is_none() });

        assert!(gone_during);
        assert!(result.is_err());
        assert!(session.habit("2").is_some());
        assert!(session.error().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_twice_is_noop() {
        let session = loaded_session().await;

        session.delete("2").await.unwrap();
        let after_first = session.habits();
        session.delete("2").await.unwrap();

        assert_eq!(session.habits(), after_first);
        assert!(session.error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_in_scenario() {
        let session = loaded_session().await;

        let habit = session.check_in("1").await.unwrap();

        assert_eq!(habit.streak, 6);
        assert!(habit.completed_today);
        assert_eq!(habit.completed_count, Some(4));
        assert_eq!(session.habit("1"), Some(habit));
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_in_is_optimistic() {
        let session = loaded_session().await;

        let (_, during) = tokio::join!(session.check_in("3"), async {
            session.habit("3").unwrap()
        });

        assert!(during.completed_today);
        assert_eq!(during.streak, 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_check_in_rolls_back() {
        let session = loaded_session().await;
        session.check_in("3").await.unwrap();

        let result = session.check_in("3").await;

        assert_eq!(result, Err(StoreError::AlreadyCompleted("3".to_string())));
        let habit = session.habit("3").unwrap();
        assert_eq!(habit.streak, 8);
        assert_eq!(habit.completed_count, Some(1));
        assert!(session.error().unwrap().contains("already completed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_count_never_exceeds_target() {
        let session = loaded_session().await;

        for _ in 0..10 {
            session
                .update("1", HabitPatch::default().with_completed_today(false))
                .await
                .unwrap();
            session.check_in("1").await.unwrap();
        }

        let habit = session.habit("1").unwrap();
        assert_eq!(habit.completed_count, Some(8));
        assert_eq!(habit.streak, 15);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_cleared_on_next_attempt() {
        let session = loaded_session().await;
        session.store().fail("check_in");
        assert!(session.check_in("1").await.is_err());
        assert!(session.error().is_some());

        session.store().heal("check_in");
        session.check_in("1").await.unwrap();

        assert!(session.error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_session_ignores_late_results() {
        let session = loaded_session().await;

        let (result, _) = tokio::join!(session.check_in("1"), async { session.close() });

        // The store call still completes and reports back to the caller.
        assert_eq!(result.unwrap().streak, 6);
        // The cache keeps the optimistic value written while still live.
        assert!(!session.is_live());
        assert_eq!(session.habit("1").unwrap().streak, 6);

        session.fetch_all().await.unwrap();
        session.store().fail("delete");
        assert!(session.delete("4").await.is_err());
        assert!(session.habit("4").is_some());
        assert!(session.error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_summary_tracks_cache() {
        let session = loaded_session().await;
        assert_eq!(session.summary().completed_today, 2);

        session.check_in("1").await.unwrap();

        let summary = session.summary();
        assert_eq!(summary.completed_today, 3);
        assert_eq!(summary.completion_rate, 75);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_serializes() {
        let session = loaded_session().await;
        let json = serde_json::to_value(session.snapshot()).unwrap();

        assert_eq!(json["loading"], false);
        assert_eq!(json["habits"].as_array().unwrap().len(), 4);
        assert!(json["error"].is_null());
    }
}
