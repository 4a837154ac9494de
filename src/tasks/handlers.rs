use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::state::AppState;

use super::dto::{
    locale_or_rfc3339, CreateReminderRequest, CreateTaskRequest, Pagination, ReminderResponse,
    TaskDetails, TaskListItem, UpdateReminderRequest, UpdateTaskRequest,
};
use super::repo::{Reminder, Task};

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
}

pub fn reminder_routes() -> Router<AppState> {
    Router::new()
        .route("/reminders", get(list_reminders).post(create_reminder))
        .route(
            "/reminders/:id",
            get(get_reminder).put(update_reminder).delete(delete_reminder),
        )
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn not_found(what: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{what} not found"))
}

fn location(path: String) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = path.parse() {
        headers.insert(axum::http::header::LOCATION, value);
    }
    headers
}

// --- tasks ---

#[instrument(skip(state))]
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<TaskListItem>>, (StatusCode, String)> {
    let tasks = Task::list_by_user(&state.db, user_id, p.limit, p.offset)
        .await
        .map_err(internal)?;
    Ok(Json(tasks.into_iter().map(TaskListItem::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, HeaderMap, Json<TaskDetails>), (StatusCode, String)> {
    if payload.title.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "title is required".into()));
    }

    let task = Task::create(
        &state.db,
        user_id,
        payload.title.trim(),
        payload.description.as_deref(),
    )
    .await
    .map_err(internal)?;

    let mut reminders = Vec::with_capacity(payload.reminders.len());
    for new in payload.reminders {
        let locale = locale_or_rfc3339(&new.date, new.locale_date);
        let mut reminder = Reminder::create(&state.db, task.id, new.date, &locale)
            .await
            .map_err(internal)?;
        state
            .scheduler
            .schedule(&mut reminder)
            .await
            .map_err(internal)?;
        reminders.push(ReminderResponse::from(reminder));
    }

    info!(task_id = %task.id, %user_id, reminders = reminders.len(), "task created");
    let headers = location(format!("/api/v1/tasks/{}", task.id));
    Ok((
        StatusCode::CREATED,
        headers,
        Json(TaskDetails::new(task, reminders)),
    ))
}

#[instrument(skip(state))]
pub async fn get_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskDetails>, (StatusCode, String)> {
    let task = Task::find_by_user(&state.db, user_id, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Task"))?;
    let reminders = Reminder::list_by_task(&state.db, task.id)
        .await
        .map_err(internal)?;

    Ok(Json(TaskDetails::new(
        task,
        reminders.into_iter().map(ReminderResponse::from).collect(),
    )))
}

#[instrument(skip(state, payload))]
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<TaskDetails>, (StatusCode, String)> {
    if payload.title.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "title is required".into()));
    }

    let task = Task::update(
        &state.db,
        user_id,
        id,
        payload.title.trim(),
        payload.description.as_deref(),
    )
    .await
    .map_err(internal)?
    .ok_or_else(|| not_found("Task"))?;

    let reminders = Reminder::list_by_task(&state.db, task.id)
        .await
        .map_err(internal)?;
    Ok(Json(TaskDetails::new(
        task,
        reminders.into_iter().map(ReminderResponse::from).collect(),
    )))
}

/// Outstanding reminder jobs are cancelled before the rows go away, so
/// nothing fires for a task that no longer exists.
#[instrument(skip(state))]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let task = Task::find_by_user(&state.db, user_id, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Task"))?;

    let reminders = Reminder::list_by_task(&state.db, task.id)
        .await
        .map_err(internal)?;
    for mut reminder in reminders {
        state
            .scheduler
            .cancel(&mut reminder)
            .await
            .map_err(internal)?;
    }

    Task::delete(&state.db, user_id, task.id)
        .await
        .map_err(internal)?;
    info!(task_id = %task.id, %user_id, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}

// --- reminders ---

#[instrument(skip(state))]
pub async fn list_reminders(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<ReminderResponse>>, (StatusCode, String)> {
    let reminders = Reminder::list_by_user(&state.db, user_id, p.limit, p.offset)
        .await
        .map_err(internal)?;
    Ok(Json(
        reminders.into_iter().map(ReminderResponse::from).collect(),
    ))
}

#[instrument(skip(state, payload))]
pub async fn create_reminder(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateReminderRequest>,
) -> Result<(StatusCode, HeaderMap, Json<ReminderResponse>), (StatusCode, String)> {
    // The target task must belong to the caller.
    let task = Task::find_by_user(&state.db, user_id, payload.task)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Task"))?;

    let locale = locale_or_rfc3339(&payload.date, payload.locale_date);
    let mut reminder = Reminder::create(&state.db, task.id, payload.date, &locale)
        .await
        .map_err(internal)?;
    state
        .scheduler
        .schedule(&mut reminder)
        .await
        .map_err(internal)?;

    info!(reminder_id = %reminder.id, task_id = %task.id, "reminder created");
    let headers = location(format!("/api/v1/reminders/{}", reminder.id));
    Ok((
        StatusCode::CREATED,
        headers,
        Json(ReminderResponse::from(reminder)),
    ))
}

#[instrument(skip(state))]
pub async fn get_reminder(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ReminderResponse>, (StatusCode, String)> {
    let reminder = Reminder::find_by_user(&state.db, user_id, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Reminder"))?;
    Ok(Json(ReminderResponse::from(reminder)))
}

#[instrument(skip(state, payload))]
pub async fn update_reminder(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateReminderRequest>,
) -> Result<Json<ReminderResponse>, (StatusCode, String)> {
    let existing = Reminder::find_by_user(&state.db, user_id, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Reminder"))?;

    let locale = locale_or_rfc3339(&payload.date, payload.locale_date);
    // Carries the old job handle and the new date; reschedule revokes the
    // former before binding a job to the latter.
    let mut reminder = Reminder::update_date(&state.db, existing.id, payload.date, &locale)
        .await
        .map_err(internal)?;
    state
        .scheduler
        .reschedule(&mut reminder)
        .await
        .map_err(internal)?;

    info!(reminder_id = %reminder.id, "reminder rescheduled");
    Ok(Json(ReminderResponse::from(reminder)))
}

#[instrument(skip(state))]
pub async fn delete_reminder(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let mut reminder = Reminder::find_by_user(&state.db, user_id, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Reminder"))?;

    state
        .scheduler
        .cancel(&mut reminder)
        .await
        .map_err(internal)?;
    Reminder::delete(&state.db, reminder.id)
        .await
        .map_err(internal)?;

    info!(reminder_id = %reminder.id, "reminder deleted");
    Ok(StatusCode::NO_CONTENT)
}
