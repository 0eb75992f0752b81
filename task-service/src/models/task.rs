use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Task status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            _ => Err(format!("Invalid task status: {}", s)),
        }
    }
}

/// Task entity, always scoped to one project.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Task {
    pub task_id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status_code: String,
    pub due_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Task {
    pub fn new(
        project_id: Uuid,
        title: String,
        description: Option<String>,
        status: TaskStatus,
        due_utc: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            task_id: Uuid::new_v4(),
            project_id,
            title,
            description,
            status_code: status.as_str().to_string(),
            due_utc,
            created_utc: now,
            updated_utc: now,
        }
    }

    /// Status of the task; unknown codes read as `Todo`.
    pub fn status(&self) -> TaskStatus {
        self.status_code.parse().unwrap_or(TaskStatus::Todo)
    }

    pub fn set_status(&mut self, status: TaskStatus) {
        self.status_code = status.as_str().to_string();
    }
}

/// Task as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TaskResponse {
    pub task_id: Uuid,
    pub project_id: Uuid,
    #[schema(example = "Draft landing page copy")]
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<Task> for TaskResponse {
    fn from(t: Task) -> Self {
        let status = t.status();
        Self {
            task_id: t.task_id,
            project_id: t.project_id,
            title: t.title,
            description: t.description,
            status,
            due_utc: t.due_utc,
            created_utc: t.created_utc,
            updated_utc: t.updated_utc,
        }
    }
}
