use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Joined view of a reminder used to build the notification mail.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReminderNotification {
    pub recipient: String,
    pub full_name: String,
    pub task_title: String,
}

/// The slice of persistence the scheduling core touches. Narrow on purpose:
/// the coordinator writes the job-handle column, the executor reads the
/// notification view and flips the completion flag.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn set_job_handle(&self, reminder_id: Uuid, handle: Option<Uuid>) -> anyhow::Result<()>;
    async fn mark_completed(&self, reminder_id: Uuid) -> anyhow::Result<()>;
    /// `Ok(None)` when the reminder no longer exists — a distinct outcome,
    /// not an error.
    async fn load_notification(
        &self,
        reminder_id: Uuid,
    ) -> anyhow::Result<Option<ReminderNotification>>;
}

pub struct PgReminderStore {
    db: PgPool,
}

impl PgReminderStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReminderStore for PgReminderStore {
    async fn set_job_handle(&self, reminder_id: Uuid, handle: Option<Uuid>) -> anyhow::Result<()> {
        sqlx::query("UPDATE reminders SET job_handle = $2 WHERE id = $1")
            .bind(reminder_id)
            .bind(handle)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn mark_completed(&self, reminder_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE reminders SET is_completed = TRUE WHERE id = $1")
            .bind(reminder_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn load_notification(
        &self,
        reminder_id: Uuid,
    ) -> anyhow::Result<Option<ReminderNotification>> {
        let note = sqlx::query_as::<_, ReminderNotification>(
            r#"
            SELECT u.email AS recipient,
                   btrim(u.first_name || ' ' || u.last_name) AS full_name,
                   t.title AS task_title
            FROM reminders r
            JOIN tasks t ON t.id = r.task_id
            JOIN users u ON u.id = t.user_id
            WHERE r.id = $1
            "#,
        )
        .bind(reminder_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(note)
    }
}
