use habitrack_core::{Habit, HabitPatch, HabitStore, NewHabit, StoreError};
use sqlx::{SqliteConnection, SqlitePool};

/// SQLite-backed habit store.
///
/// Check-ins are a single conditional `UPDATE`, so concurrent check-ins on
/// the same habit are serialized by the database: only one of them wins.
pub struct HabitRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct HabitRow {
    id: String,
    name: String,
    description: String,
    color: String,
    streak: i64,
    completed_today: bool,
    created_at: String,
    target_count: Option<i64>,
    completed_count: Option<i64>,
}

impl From<HabitRow> for Habit {
    fn from(row: HabitRow) -> Self {
        Habit {
            id: row.id,
            name: row.name,
            description: row.description,
            color: row.color,
            streak: to_u32(row.streak),
            completed_today: row.completed_today,
            created_at: row.created_at,
            target_count: row.target_count.map(to_u32),
            completed_count: row.completed_count.map(to_u32),
        }
    }
}

fn to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn transport(e: sqlx::Error) -> StoreError {
    tracing::warn!("Database error: {}", e);
    StoreError::Transport(e.to_string())
}

impl HabitRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM habits WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(transport)?;
        Ok(row.is_some())
    }

    async fn fetch(&self, id: &str) -> Result<Habit, StoreError> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

/// Reads, merges and writes back one habit on a connection that already
/// holds the write lock.
async fn merge_patch(
    conn: &mut SqliteConnection,
    id: &str,
    patch: &HabitPatch,
) -> Result<Habit, StoreError> {
    let row: Option<HabitRow> = sqlx::query_as("SELECT * FROM habits WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(transport)?;

    let mut habit = row
        .map(Habit::from)
        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
    habit.apply(patch);

    sqlx::query(
        r#"
        UPDATE habits
        SET name = ?, description = ?, color = ?, streak = ?, completed_today = ?,
            target_count = ?, completed_count = ?
        WHERE id = ?
        "#,
    )
    .bind(&habit.name)
    .bind(&habit.description)
    .bind(&habit.color)
    .bind(i64::from(habit.streak))
    .bind(habit.completed_today)
    .bind(habit.target_count.map(i64::from))
    .bind(habit.completed_count.map(i64::from))
    .bind(id)
    .execute(&mut *conn)
    .await
    .map_err(transport)?;

    Ok(habit)
}

impl HabitStore for HabitRepository {
    async fn get_all(&self) -> Result<Vec<Habit>, StoreError> {
        // Newest first: rowid follows insertion order.
        let rows: Vec<HabitRow> = sqlx::query_as("SELECT * FROM habits ORDER BY rowid DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(transport)?;

        Ok(rows.into_iter().map(Habit::from).collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Habit>, StoreError> {
        let row: Option<HabitRow> = sqlx::query_as("SELECT * FROM habits WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(transport)?;

        Ok(row.map(Habit::from))
    }

    async fn create(&self, data: NewHabit) -> Result<Habit, StoreError> {
        let habit = Habit::from_new(data);

        sqlx::query(
            r#"
            INSERT INTO habits (id, name, description, color, streak, completed_today, created_at, target_count, completed_count)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&habit.id)
        .bind(&habit.name)
        .bind(&habit.description)
        .bind(&habit.color)
        .bind(i64::from(habit.streak))
        .bind(habit.completed_today)
        .bind(&habit.created_at)
        .bind(habit.target_count.map(i64::from))
        .bind(habit.completed_count.map(i64::from))
        .execute(&self.pool)
        .await
        .map_err(transport)?;

        tracing::debug!(id = %habit.id, "created habit");
        self.fetch(&habit.id).await
    }

    async fn update(&self, id: &str, patch: HabitPatch) -> Result<Habit, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(transport)?;

        // Take the write lock up front. A deferred transaction that reads and
        // then writes fails with SQLITE_BUSY instead of waiting when another
        // connection wrote in between.
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(transport)?;

        let result = merge_patch(&mut conn, id, &patch).await;
        let end = if result.is_ok() { "COMMIT" } else { "ROLLBACK" };
        sqlx::query(end)
            .execute(&mut *conn)
            .await
            .map_err(transport)?;

        let habit = result?;
        tracing::debug!(id, "updated habit");
        Ok(habit)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM habits WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(transport)?;
        Ok(())
    }

    async fn check_in(&self, id: &str) -> Result<Habit, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE habits
            SET completed_today = 1,
                completed_count = MIN(COALESCE(completed_count, 0) + 1, MAX(COALESCE(target_count, 1), 1)),
                streak = streak + 1
            WHERE id = ? AND completed_today = 0
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(transport)?;

        if result.rows_affected() == 0 {
            return Err(if self.exists(id).await? {
                StoreError::AlreadyCompleted(id.to_string())
            } else {
                StoreError::NotFound(id.to_string())
            });
        }

        tracing::debug!(id, "checked in habit");
        self.fetch(id).await
    }
}
