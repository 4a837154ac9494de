mod app;
mod auth;
mod config;
mod contact;
mod mail;
mod scheduler;
mod state;
mod tasks;

use state::AppState;
use tasks::repo::Reminder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "doable=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = AppState::init().await?;

    if let Err(e) = sqlx::migrate!("./migrations").run(&state.db).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }

    resubmit_pending(&state).await;

    let app = app::build_app(state);
    app::serve(app).await
}

/// The in-process job backend loses its jobs on shutdown; re-submit one for
/// every reminder that has not completed. Past-due reminders fire right
/// away, which is the closest we can get to having been up the whole time.
async fn resubmit_pending(state: &AppState) {
    let pending = match Reminder::list_pending(&state.db).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(error = %e, "could not load pending reminders");
            return;
        }
    };

    let total = pending.len();
    let mut resubmitted = 0usize;
    for mut reminder in pending {
        match state.scheduler.schedule(&mut reminder).await {
            Ok(_) => resubmitted += 1,
            Err(e) => {
                tracing::error!(reminder_id = %reminder.id, error = %e, "resubmit failed")
            }
        }
    }
    tracing::info!(resubmitted, total, "pending reminders resubmitted");
}
