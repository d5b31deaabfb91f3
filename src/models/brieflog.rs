use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable annotation recording why a task changed.
///
/// Brief logs are **append-only**: rows are never updated or deleted, even
/// when the task they reference is soft-deleted. Types 1 through 4 mark the
/// "problematic" edits the habit analytics count; 5 through 8 are free-form
/// reflections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BriefLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub brief_type: BriefType,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// The fixed brief log taxonomy. Stored and serialized as its integer code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "i64", into = "i64")]
pub enum BriefType {
    /// 1: reason a task was deleted.
    DeleteReason,
    /// 2: the task's category was changed.
    CategoryChange,
    /// 3: the task's priority was changed.
    PriorityChange,
    /// 4: the task's due date was changed.
    DueDateChange,
    /// 5: free-form reflection on the task.
    Reflection,
    /// 6: note attached on completion.
    CompletionNote,
    /// 7: note about a focus session on the task.
    FocusNote,
    /// 8: anything else.
    Other,
}

impl BriefType {
    pub fn code(&self) -> i64 {
        match self {
            Self::DeleteReason => 1,
            Self::CategoryChange => 2,
            Self::PriorityChange => 3,
            Self::DueDateChange => 4,
            Self::Reflection => 5,
            Self::CompletionNote => 6,
            Self::FocusNote => 7,
            Self::Other => 8,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::DeleteReason),
            2 => Some(Self::CategoryChange),
            3 => Some(Self::PriorityChange),
            4 => Some(Self::DueDateChange),
            5 => Some(Self::Reflection),
            6 => Some(Self::CompletionNote),
            7 => Some(Self::FocusNote),
            8 => Some(Self::Other),
            _ => None,
        }
    }

    /// Types 1-4 flag edits the habit analytics treat as problematic.
    pub fn is_problematic(&self) -> bool {
        self.code() <= 4
    }
}

impl From<BriefType> for i64 {
    fn from(t: BriefType) -> Self {
        t.code()
    }
}

impl TryFrom<i64> for BriefType {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("invalid brief_type: {code}"))
    }
}

/// Input for appending a brief log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBriefLogInput {
    pub task_id: Uuid,
    pub brief_type: BriefType,
    pub content: String,
}
