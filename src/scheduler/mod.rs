//! Scheduled reminder delivery: the coordinator owning the job-to-reminder
//! binding, the deferred job backend it talks to, and the executor that runs
//! at fire time.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::tasks::repo::Reminder;

mod backend;
mod executor;
mod store;

pub use backend::{JobBackend, ReminderJob, TokioJobBackend, REMINDER_VERB};
pub use executor::ReminderExecutor;
pub use store::{PgReminderStore, ReminderNotification, ReminderStore};

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("job backend: {0}")]
    Backend(anyhow::Error),
    #[error("reminder store: {0}")]
    Store(anyhow::Error),
}

/// Coordinates the lifecycle of the deferred job bound to a reminder. Holds
/// the invariant that a non-completed reminder has at most one outstanding
/// job handle.
pub struct ReminderScheduler {
    store: Arc<dyn ReminderStore>,
    backend: Arc<dyn JobBackend>,
}

impl ReminderScheduler {
    pub fn new(store: Arc<dyn ReminderStore>, backend: Arc<dyn JobBackend>) -> Self {
        Self { store, backend }
    }

    /// Submit a job for the reminder's trigger time and persist the handle,
    /// both on the record and on the passed-in struct. Always submits a new
    /// job; a caller replacing an existing one cancels first.
    pub async fn schedule(&self, reminder: &mut Reminder) -> Result<Uuid, ScheduleError> {
        let handle = self
            .backend
            .submit(reminder.id, reminder.date)
            .await
            .map_err(ScheduleError::Backend)?;
        self.store
            .set_job_handle(reminder.id, Some(handle))
            .await
            .map_err(ScheduleError::Store)?;
        reminder.job_handle = Some(handle);
        Ok(handle)
    }

    /// Cancel the outstanding job, then schedule at the current trigger
    /// time. Net effect: exactly one live job bound to the reminder.
    pub async fn reschedule(&self, reminder: &mut Reminder) -> Result<Uuid, ScheduleError> {
        self.cancel(reminder).await?;
        self.schedule(reminder).await
    }

    /// Revoke and clear the outstanding job, if any. Completed reminders and
    /// reminders without a handle are left alone — cancelling a fired or
    /// absent job is harmless, so neither case is an error.
    pub async fn cancel(&self, reminder: &mut Reminder) -> Result<(), ScheduleError> {
        if reminder.is_completed {
            return Ok(());
        }
        let Some(handle) = reminder.job_handle else {
            return Ok(());
        };
        self.backend
            .revoke(handle)
            .await
            .map_err(ScheduleError::Backend)?;
        self.store
            .set_job_handle(reminder.id, None)
            .await
            .map_err(ScheduleError::Store)?;
        reminder.job_handle = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;

    use super::store::ReminderNotification;
    use super::*;

    /// Backend double tracking which jobs are live and what they are bound
    /// to.
    struct FakeBackend {
        live: Mutex<HashMap<Uuid, (Uuid, OffsetDateTime)>>,
    }

    impl FakeBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                live: Mutex::new(HashMap::new()),
            })
        }

        fn live_jobs(&self) -> Vec<(Uuid, OffsetDateTime)> {
            self.live.lock().unwrap().values().cloned().collect()
        }
    }

    #[async_trait]
    impl JobBackend for FakeBackend {
        async fn submit(&self, reminder_id: Uuid, run_at: OffsetDateTime) -> anyhow::Result<Uuid> {
            let handle = Uuid::new_v4();
            self.live
                .lock()
                .unwrap()
                .insert(handle, (reminder_id, run_at));
            Ok(handle)
        }

        async fn revoke(&self, handle: Uuid) -> anyhow::Result<()> {
            self.live.lock().unwrap().remove(&handle);
            Ok(())
        }
    }

    struct FakeStore {
        handles: Mutex<HashMap<Uuid, Option<Uuid>>>,
    }

    impl FakeStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                handles: Mutex::new(HashMap::new()),
            })
        }

        fn handle_of(&self, reminder_id: Uuid) -> Option<Uuid> {
            self.handles
                .lock()
                .unwrap()
                .get(&reminder_id)
                .copied()
                .flatten()
        }
    }

    #[async_trait]
    impl ReminderStore for FakeStore {
        async fn set_job_handle(
            &self,
            reminder_id: Uuid,
            handle: Option<Uuid>,
        ) -> anyhow::Result<()> {
            self.handles.lock().unwrap().insert(reminder_id, handle);
            Ok(())
        }

        async fn mark_completed(&self, _reminder_id: Uuid) -> anyhow::Result<()> {
            Ok(())
        }

        async fn load_notification(
            &self,
            _reminder_id: Uuid,
        ) -> anyhow::Result<Option<ReminderNotification>> {
            Ok(None)
        }
    }

    fn reminder(date: OffsetDateTime) -> Reminder {
        Reminder {
            id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            date,
            locale_date: String::new(),
            is_completed: false,
            job_handle: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn in_an_hour() -> OffsetDateTime {
        OffsetDateTime::now_utc() + time::Duration::hours(1)
    }

    #[tokio::test]
    async fn schedule_binds_one_job_to_the_trigger_time() {
        let (store, backend) = (FakeStore::new(), FakeBackend::new());
        let scheduler = ReminderScheduler::new(store.clone(), backend.clone());
        let mut r = reminder(in_an_hour());

        let handle = scheduler.schedule(&mut r).await.unwrap();

        assert_eq!(r.job_handle, Some(handle));
        assert_eq!(store.handle_of(r.id), Some(handle));
        assert_eq!(backend.live_jobs(), vec![(r.id, r.date)]);
    }

    #[tokio::test]
    async fn cancel_revokes_and_clears_then_stays_a_noop() {
        let (store, backend) = (FakeStore::new(), FakeBackend::new());
        let scheduler = ReminderScheduler::new(store.clone(), backend.clone());
        let mut r = reminder(in_an_hour());
        scheduler.schedule(&mut r).await.unwrap();

        scheduler.cancel(&mut r).await.unwrap();
        assert_eq!(r.job_handle, None);
        assert_eq!(store.handle_of(r.id), None);
        assert!(backend.live_jobs().is_empty());

        // Second cancel: nothing left to do, no error.
        scheduler.cancel(&mut r).await.unwrap();
        assert_eq!(r.job_handle, None);
    }

    #[tokio::test]
    async fn cancel_leaves_completed_reminders_alone() {
        let (store, backend) = (FakeStore::new(), FakeBackend::new());
        let scheduler = ReminderScheduler::new(store.clone(), backend.clone());
        let mut r = reminder(in_an_hour());
        scheduler.schedule(&mut r).await.unwrap();
        r.is_completed = true;

        scheduler.cancel(&mut r).await.unwrap();

        // Handle stays in place; a completed reminder's handle is ignored.
        assert!(r.job_handle.is_some());
        assert_eq!(backend.live_jobs().len(), 1);
    }

    #[tokio::test]
    async fn repeated_reschedule_keeps_exactly_one_live_job() {
        let (store, backend) = (FakeStore::new(), FakeBackend::new());
        let scheduler = ReminderScheduler::new(store.clone(), backend.clone());
        let mut r = reminder(in_an_hour());
        scheduler.schedule(&mut r).await.unwrap();

        r.date = in_an_hour() + time::Duration::days(1);
        scheduler.reschedule(&mut r).await.unwrap();
        let final_date = in_an_hour() + time::Duration::days(2);
        r.date = final_date;
        scheduler.reschedule(&mut r).await.unwrap();

        let live = backend.live_jobs();
        assert_eq!(live, vec![(r.id, final_date)]);
        assert_eq!(store.handle_of(r.id), r.job_handle);
    }
}
