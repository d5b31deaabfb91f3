use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's task.
///
/// Tasks are **soft-deleted**: deleting one sets `deleted_at` rather than
/// removing the row, so brief logs referencing it stay resolvable and the
/// habit analytics can still correlate edits against deleted tasks. Rows are
/// only physically removed through the explicit purge and batch-delete paths.
///
/// `focus_time` and `pomodoro_count` are accumulators rolled up when a
/// pomodoro session completes against this task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub priority: Priority,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    /// Accumulated focused minutes from completed pomodoro sessions.
    pub focus_time: i64,
    pub pomodoro_count: i64,
    pub due_date: Option<DateTime<Utc>>,
    /// Minutes before `due_date` at which a reminder should fire.
    pub alarm_offset_min: Option<i64>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The three fixed task categories.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Work,
    Study,
    Life,
}

impl Category {
    pub const ALL: [Category; 3] = [Self::Work, Self::Study, Self::Life];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Study => "study",
            Self::Life => "life",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "work" => Some(Self::Work),
            "study" => Some(Self::Study),
            "life" => Some(Self::Life),
            _ => None,
        }
    }
}

/// The four fixed task priorities, lowest to highest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

/// Input for creating a new task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskInput {
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub alarm_offset_min: Option<i64>,
}

/// Input for updating a task. Only provided fields are changed.
///
/// When `brief_type`/`brief_content` accompany the change, a brief log entry
/// is written in the same transaction as the update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
    pub alarm_offset_min: Option<i64>,
    #[serde(default)]
    pub brief_type: Option<super::BriefType>,
    #[serde(default)]
    pub brief_content: Option<String>,
}

/// Simple COUNT/SUM aggregates over a user's live tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub overdue: i64,
    pub total_focus_time: i64,
    pub total_pomodoros: i64,
}
