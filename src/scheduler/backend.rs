use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;
use tokio::task::AbortHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Verb tag carried through the fire-time status strings.
pub const REMINDER_VERB: &str = "reminder mail";

/// Work performed when a submitted job fires.
#[async_trait]
pub trait ReminderJob: Send + Sync + 'static {
    async fn run(&self, reminder_id: Uuid, verb: &str) -> String;
}

/// One-shot deferred job backend. `submit` returns immediately with an
/// opaque handle; execution happens later on the worker side. `revoke` of an
/// unknown or already-fired handle is success — cancellation must stay
/// idempotent.
#[async_trait]
pub trait JobBackend: Send + Sync {
    async fn submit(&self, reminder_id: Uuid, run_at: OffsetDateTime) -> anyhow::Result<Uuid>;
    async fn revoke(&self, handle: Uuid) -> anyhow::Result<()>;
}

/// In-process backend: each submitted job is a tokio task sleeping until its
/// trigger time, abortable through the handle registry. Past-due trigger
/// times fire immediately.
pub struct TokioJobBackend {
    runner: Arc<dyn ReminderJob>,
    jobs: Arc<DashMap<Uuid, AbortHandle>>,
}

impl TokioJobBackend {
    pub fn new(runner: Arc<dyn ReminderJob>) -> Self {
        Self {
            runner,
            jobs: Arc::new(DashMap::new()),
        }
    }

    pub fn pending(&self) -> usize {
        self.jobs.len()
    }
}

#[async_trait]
impl JobBackend for TokioJobBackend {
    async fn submit(&self, reminder_id: Uuid, run_at: OffsetDateTime) -> anyhow::Result<Uuid> {
        let handle = Uuid::new_v4();
        let wait = std::time::Duration::try_from(run_at - OffsetDateTime::now_utc())
            .unwrap_or(std::time::Duration::ZERO);

        let jobs = Arc::clone(&self.jobs);
        let runner = Arc::clone(&self.runner);
        let task = tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            // Past this point a revoke no longer aborts the run.
            jobs.remove(&handle);
            let status = runner.run(reminder_id, REMINDER_VERB).await;
            info!(%reminder_id, job = %handle, %status, "reminder job finished");
        });
        self.jobs.insert(handle, task.abort_handle());

        debug!(%reminder_id, job = %handle, %run_at, "reminder job submitted");
        Ok(handle)
    }

    async fn revoke(&self, handle: Uuid) -> anyhow::Result<()> {
        if let Some((_, task)) = self.jobs.remove(&handle) {
            task.abort();
            debug!(job = %handle, "reminder job revoked");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    struct RecordingJob {
        runs: Mutex<Vec<Uuid>>,
    }

    impl RecordingJob {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                runs: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ReminderJob for RecordingJob {
        async fn run(&self, reminder_id: Uuid, verb: &str) -> String {
            self.runs.lock().unwrap().push(reminder_id);
            format!("test@example.com success = {verb}")
        }
    }

    #[tokio::test]
    async fn past_due_job_fires_and_leaves_the_registry() {
        let job = RecordingJob::new();
        let backend = TokioJobBackend::new(job.clone());
        let reminder_id = Uuid::new_v4();

        backend
            .submit(reminder_id, OffsetDateTime::now_utc() - time::Duration::seconds(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(job.runs.lock().unwrap().as_slice(), &[reminder_id]);
        assert_eq!(backend.pending(), 0);
    }

    #[tokio::test]
    async fn revoked_job_never_fires() {
        let job = RecordingJob::new();
        let backend = TokioJobBackend::new(job.clone());
        let reminder_id = Uuid::new_v4();

        let handle = backend
            .submit(
                reminder_id,
                OffsetDateTime::now_utc() + time::Duration::milliseconds(100),
            )
            .await
            .unwrap();
        backend.revoke(handle).await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert!(job.runs.lock().unwrap().is_empty());
        assert_eq!(backend.pending(), 0);
    }

    #[tokio::test]
    async fn revoke_is_idempotent_and_tolerates_unknown_handles() {
        let backend = TokioJobBackend::new(RecordingJob::new());

        // Never submitted
        backend.revoke(Uuid::new_v4()).await.unwrap();

        let handle = backend
            .submit(
                Uuid::new_v4(),
                OffsetDateTime::now_utc() + time::Duration::minutes(5),
            )
            .await
            .unwrap();
        backend.revoke(handle).await.unwrap();
        // Second revoke of the same handle
        backend.revoke(handle).await.unwrap();
        assert_eq!(backend.pending(), 0);
    }
}
