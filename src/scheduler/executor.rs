use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::mail::{self, MailTransport};

use super::backend::ReminderJob;
use super::store::ReminderStore;

/// Fire-time path: reload the reminder, dispatch the notification, mark the
/// reminder completed. Every failure here ends as a status string — a fired
/// job has nobody left to report to.
pub struct ReminderExecutor {
    store: Arc<dyn ReminderStore>,
    mailer: Arc<dyn MailTransport>,
    config: Arc<AppConfig>,
}

impl ReminderExecutor {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        mailer: Arc<dyn MailTransport>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            store,
            mailer,
            config,
        }
    }
}

#[async_trait]
impl ReminderJob for ReminderExecutor {
    async fn run(&self, reminder_id: Uuid, verb: &str) -> String {
        let note = match self.store.load_notification(reminder_id).await {
            Ok(Some(note)) => note,
            Ok(None) => {
                // Deleted between scheduling and firing; an expected race.
                return format!("Reminder - {} not found = {}", reminder_id, verb);
            }
            Err(e) => {
                error!(%reminder_id, error = %e, "reminder lookup failed");
                return format!("Reminder - {} not found = {}", reminder_id, verb);
            }
        };

        let ctx = mail::messages::reminder_mail(&self.config, &note);
        let status = mail::deliver(self.mailer.as_ref(), &ctx, verb).await;

        // One-shot either way: failed sends are not retried, and a completed
        // reminder keeps later cancels from revoking a job that already ran.
        if let Err(e) = self.store.mark_completed(reminder_id).await {
            error!(%reminder_id, error = %e, "failed to mark reminder completed");
        }

        status
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use crate::mail::test_support::FakeTransport;
    use crate::scheduler::store::ReminderNotification;
    use crate::scheduler::REMINDER_VERB;

    use super::*;

    struct FakeStore {
        note: Option<ReminderNotification>,
        completed: Mutex<Vec<Uuid>>,
    }

    impl FakeStore {
        fn new(note: Option<ReminderNotification>) -> Arc<Self> {
            Arc::new(Self {
                note,
                completed: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ReminderStore for FakeStore {
        async fn set_job_handle(
            &self,
            _reminder_id: Uuid,
            _handle: Option<Uuid>,
        ) -> anyhow::Result<()> {
            Ok(())
        }

        async fn mark_completed(&self, reminder_id: Uuid) -> anyhow::Result<()> {
            self.completed.lock().unwrap().push(reminder_id);
            Ok(())
        }

        async fn load_notification(
            &self,
            _reminder_id: Uuid,
        ) -> anyhow::Result<Option<ReminderNotification>> {
            Ok(self.note.clone())
        }
    }

    fn note() -> ReminderNotification {
        ReminderNotification {
            recipient: "ada@example.com".into(),
            full_name: "Ada Lovelace".into(),
            task_title: "Pay bills".into(),
        }
    }

    fn executor(store: Arc<FakeStore>, transport: Arc<FakeTransport>) -> ReminderExecutor {
        ReminderExecutor::new(store, transport, Arc::new(AppConfig::for_tests()))
    }

    #[tokio::test]
    async fn missing_reminder_reports_not_found_and_sends_nothing() {
        let store = FakeStore::new(None);
        let transport = Arc::new(FakeTransport::new(false));
        let reminder_id = Uuid::new_v4();

        let status = executor(store.clone(), transport.clone())
            .run(reminder_id, REMINDER_VERB)
            .await;

        assert_eq!(
            status,
            format!("Reminder - {} not found = reminder mail", reminder_id)
        );
        assert!(transport.sent.lock().unwrap().is_empty());
        assert!(store.completed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn successful_dispatch_marks_the_reminder_completed() {
        let store = FakeStore::new(Some(note()));
        let transport = Arc::new(FakeTransport::new(false));
        let reminder_id = Uuid::new_v4();

        let status = executor(store.clone(), transport.clone())
            .run(reminder_id, REMINDER_VERB)
            .await;

        assert_eq!(status, "ada@example.com success = reminder mail");
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains("'Pay bills'"));
        assert_eq!(store.completed.lock().unwrap().as_slice(), &[reminder_id]);
    }

    #[tokio::test]
    async fn transport_failure_still_completes_the_reminder() {
        let store = FakeStore::new(Some(note()));
        let transport = Arc::new(FakeTransport::new(true));
        let reminder_id = Uuid::new_v4();

        let status = executor(store.clone(), transport.clone())
            .run(reminder_id, REMINDER_VERB)
            .await;

        assert_eq!(status, "ada@example.com error = reminder mail");
        assert_eq!(store.completed.lock().unwrap().as_slice(), &[reminder_id]);
    }
}
