use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Reminder row. `job_handle` is the opaque id of the outstanding deferred
/// job, if any; `locale_date` is the client's own rendering of the trigger
/// time, stored verbatim for display.
#[derive(Debug, Clone, FromRow)]
pub struct Reminder {
    pub id: Uuid,
    pub task_id: Uuid,
    pub date: OffsetDateTime,
    pub locale_date: String,
    pub is_completed: bool,
    pub job_handle: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

impl Task {
    pub async fn list_by_user(
        db: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, created_at
            FROM tasks
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find_by_user(
        db: &PgPool,
        user_id: Uuid,
        task_id: Uuid,
    ) -> anyhow::Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, created_at
            FROM tasks
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(task)
    }

    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        title: &str,
        description: Option<&str>,
    ) -> anyhow::Result<Task> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (user_id, title, description)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, title, description, created_at
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(description)
        .fetch_one(db)
        .await?;
        Ok(task)
    }

    pub async fn update(
        db: &PgPool,
        user_id: Uuid,
        task_id: Uuid,
        title: &str,
        description: Option<&str>,
    ) -> anyhow::Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks SET title = $3, description = $4
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, description, created_at
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .bind(title)
        .bind(description)
        .fetch_optional(db)
        .await?;
        Ok(task)
    }

    /// Rows in `reminders` cascade. Callers cancel the reminders' jobs
    /// before calling this.
    pub async fn delete(db: &PgPool, user_id: Uuid, task_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(task_id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl Reminder {
    pub async fn list_by_user(
        db: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Reminder>> {
        let rows = sqlx::query_as::<_, Reminder>(
            r#"
            SELECT r.id, r.task_id, r.date, r.locale_date, r.is_completed,
                   r.job_handle, r.created_at
            FROM reminders r
            JOIN tasks t ON t.id = r.task_id
            WHERE t.user_id = $1
            ORDER BY r.date ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find_by_user(
        db: &PgPool,
        user_id: Uuid,
        reminder_id: Uuid,
    ) -> anyhow::Result<Option<Reminder>> {
        let reminder = sqlx::query_as::<_, Reminder>(
            r#"
            SELECT r.id, r.task_id, r.date, r.locale_date, r.is_completed,
                   r.job_handle, r.created_at
            FROM reminders r
            JOIN tasks t ON t.id = r.task_id
            WHERE r.id = $1 AND t.user_id = $2
            "#,
        )
        .bind(reminder_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(reminder)
    }

    pub async fn list_by_task(db: &PgPool, task_id: Uuid) -> anyhow::Result<Vec<Reminder>> {
        let rows = sqlx::query_as::<_, Reminder>(
            r#"
            SELECT id, task_id, date, locale_date, is_completed, job_handle, created_at
            FROM reminders
            WHERE task_id = $1
            ORDER BY date ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Non-completed reminders; used to resubmit jobs after a restart.
    pub async fn list_pending(db: &PgPool) -> anyhow::Result<Vec<Reminder>> {
        let rows = sqlx::query_as::<_, Reminder>(
            r#"
            SELECT id, task_id, date, locale_date, is_completed, job_handle, created_at
            FROM reminders
            WHERE is_completed = FALSE
            ORDER BY date ASC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn create(
        db: &PgPool,
        task_id: Uuid,
        date: OffsetDateTime,
        locale_date: &str,
    ) -> anyhow::Result<Reminder> {
        let reminder = sqlx::query_as::<_, Reminder>(
            r#"
            INSERT INTO reminders (task_id, date, locale_date)
            VALUES ($1, $2, $3)
            RETURNING id, task_id, date, locale_date, is_completed, job_handle, created_at
            "#,
        )
        .bind(task_id)
        .bind(date)
        .bind(locale_date)
        .fetch_one(db)
        .await?;
        Ok(reminder)
    }

    pub async fn update_date(
        db: &PgPool,
        reminder_id: Uuid,
        date: OffsetDateTime,
        locale_date: &str,
    ) -> anyhow::Result<Reminder> {
        let reminder = sqlx::query_as::<_, Reminder>(
            r#"
            UPDATE reminders SET date = $2, locale_date = $3
            WHERE id = $1
            RETURNING id, task_id, date, locale_date, is_completed, job_handle, created_at
            "#,
        )
        .bind(reminder_id)
        .bind(date)
        .bind(locale_date)
        .fetch_one(db)
        .await?;
        Ok(reminder)
    }

    pub async fn delete(db: &PgPool, reminder_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM reminders WHERE id = $1")
            .bind(reminder_id)
            .execute(db)
            .await?;
        Ok(())
    }
}
