use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

pub type BoardId = String;
pub type ColumnId = String;
pub type TaskId = String;
pub type CommentId = String;

/// Board summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
  pub id: BoardId,
  pub name: String,
}

/// Board column. `task_count` comes from the server's column listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
  pub id: ColumnId,
  pub name: String,
  pub task_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
  pub id: TaskId,
  pub title: String,
  pub description: Option<String>,
  pub priority: Priority,
  pub column_id: ColumnId,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
  pub id: CommentId,
  pub author_name: String,
  pub body: String,
  pub created_at: DateTime<Utc>,
}

/// One page of a column's task list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPage {
  pub items: Vec<Task>,
  pub page: u32,
  pub limit: u32,
  pub total: u64,
}

/// Parameters of a task-list query.
///
/// Only page 1 is requested today; `page` is part of the key so further
/// pages would cache independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskListParams {
  pub column_id: ColumnId,
  pub search: String,
  pub page: u32,
  pub limit: u32,
}

impl TaskListParams {
  /// First page of `column_id`, filtered by `search` (trimmed).
  pub fn new(column_id: impl Into<ColumnId>, search: &str, limit: u32) -> Self {
    Self {
      column_id: column_id.into(),
      search: search.trim().to_string(),
      page: 1,
      limit,
    }
  }
}

/// Task priority as shown everywhere in the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Priority {
  Low,
  #[default]
  Medium,
  High,
}

impl Priority {
  pub fn label(&self) -> &'static str {
    match self {
      Priority::Low => "Low",
      Priority::Medium => "Medium",
      Priority::High => "High",
    }
  }

  /// Parse a label case-insensitively.
  pub fn from_label(label: &str) -> Option<Self> {
    match label.trim().to_ascii_lowercase().as_str() {
      "low" => Some(Priority::Low),
      "medium" => Some(Priority::Medium),
      "high" => Some(Priority::High),
      _ => None,
    }
  }
}

impl fmt::Display for Priority {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// Priority as the server sent it: a 1-5 scale, a label, or nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPriority {
  Numeric(f64),
  Label(String),
  Absent,
}

impl RawPriority {
  pub fn from_json(value: Option<&Value>) -> Self {
    match value {
      Some(Value::Number(n)) => n.as_f64().map(RawPriority::Numeric).unwrap_or(RawPriority::Absent),
      Some(Value::String(s)) => RawPriority::Label(s.clone()),
      _ => RawPriority::Absent,
    }
  }
}

impl From<&RawPriority> for Priority {
  /// `<= 2` is Low, `>= 4` is High, anything else (including unknown labels
  /// and missing values) is Medium.
  fn from(raw: &RawPriority) -> Self {
    match raw {
      RawPriority::Numeric(n) if *n <= 2.0 => Priority::Low,
      RawPriority::Numeric(n) if *n >= 4.0 => Priority::High,
      RawPriority::Numeric(_) => Priority::Medium,
      RawPriority::Label(label) => Priority::from_label(label).unwrap_or_default(),
      RawPriority::Absent => Priority::Medium,
    }
  }
}

/// Fields for a new task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
  pub title: String,
  pub description: Option<String>,
  pub priority: Priority,
}

/// Partial task update. `column_id` moves the task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
  pub title: Option<String>,
  pub description: Option<String>,
  pub priority: Option<Priority>,
  pub column_id: Option<ColumnId>,
}

impl TaskPatch {
  pub fn move_to(column_id: impl Into<ColumnId>) -> Self {
    Self {
      column_id: Some(column_id.into()),
      ..Self::default()
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
  pub author_name: String,
  pub body: String,
}
