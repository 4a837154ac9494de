use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::mail::{MailTransport, SmtpMailer};
use crate::scheduler::{
    JobBackend, PgReminderStore, ReminderExecutor, ReminderScheduler, ReminderStore,
    TokioJobBackend,
};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub mailer: Arc<dyn MailTransport>,
    pub scheduler: Arc<ReminderScheduler>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;

        let mailer = Arc::new(SmtpMailer::new(&config.smtp)?) as Arc<dyn MailTransport>;
        let store = Arc::new(PgReminderStore::new(db.clone())) as Arc<dyn ReminderStore>;
        let executor = Arc::new(ReminderExecutor::new(
            Arc::clone(&store),
            Arc::clone(&mailer),
            Arc::clone(&config),
        ));
        let backend = Arc::new(TokioJobBackend::new(executor)) as Arc<dyn JobBackend>;
        let scheduler = Arc::new(ReminderScheduler::new(store, backend));

        Ok(Self {
            db,
            config,
            mailer,
            scheduler,
        })
    }
}
