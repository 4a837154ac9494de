use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{Reminder, Task};

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

/// Reminder payload nested inside a task create.
#[derive(Debug, Deserialize)]
pub struct NewReminder {
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub locale_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub reminders: Vec<NewReminder>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReminderRequest {
    pub task: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub locale_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReminderRequest {
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub locale_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskListItem {
    pub id: Uuid,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Task> for TaskListItem {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            created_at: task.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskDetails {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub reminders: Vec<ReminderResponse>,
}

impl TaskDetails {
    pub fn new(task: Task, reminders: Vec<ReminderResponse>) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            created_at: task.created_at,
            reminders,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReminderResponse {
    pub id: Uuid,
    pub task: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub locale_date: String,
    pub is_completed: bool,
}

impl From<Reminder> for ReminderResponse {
    fn from(reminder: Reminder) -> Self {
        Self {
            id: reminder.id,
            task: reminder.task_id,
            date: reminder.date,
            locale_date: reminder.locale_date,
            is_completed: reminder.is_completed,
        }
    }
}

/// The stored display string: what the client sent, or the RFC 3339
/// rendering when it sent nothing.
pub fn locale_or_rfc3339(date: &OffsetDateTime, locale_date: Option<String>) -> String {
    match locale_date {
        Some(s) if !s.is_empty() => s,
        _ => date.format(&Rfc3339).unwrap_or_else(|_| date.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn reminder_response_serializes_rfc3339_and_hides_the_job_handle() {
        let reminder = Reminder {
            id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            date: datetime!(2024-01-01 09:00 UTC),
            locale_date: "2024-01-01 09:00".into(),
            is_completed: false,
            job_handle: Some(Uuid::new_v4()),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };

        let json = serde_json::to_string(&ReminderResponse::from(reminder)).unwrap();
        assert!(json.contains("\"date\":\"2024-01-01T09:00:00Z\""));
        assert!(!json.contains("job_handle"));
    }

    #[test]
    fn locale_string_prefers_what_the_client_sent() {
        let date = datetime!(2024-01-01 09:00 UTC);
        assert_eq!(
            locale_or_rfc3339(&date, Some("Jan 1st, 9am".into())),
            "Jan 1st, 9am"
        );
        assert_eq!(locale_or_rfc3339(&date, None), "2024-01-01T09:00:00Z");
        assert_eq!(
            locale_or_rfc3339(&date, Some(String::new())),
            "2024-01-01T09:00:00Z"
        );
    }
}
