//! Serde types matching the board API's JSON payloads.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::types::{
  Board, Column, Comment, NewComment, NewTask, Priority, RawPriority, Task, TaskPage, TaskPatch,
};

/// Accept ids sent either as strings or as numbers.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Id {
    Text(String),
    Number(i64),
  }

  Ok(match Id::deserialize(deserializer)? {
    Id::Text(s) => s,
    Id::Number(n) => n.to_string(),
  })
}

fn first_page() -> u32 {
  1
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiBoard {
  #[serde(deserialize_with = "id_string")]
  pub id: String,
  pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiColumn {
  #[serde(deserialize_with = "id_string")]
  pub id: String,
  pub name: String,
  #[serde(rename = "taskCount", default)]
  pub task_count: u32,
}

#[derive(Debug, Deserialize)]
pub struct ApiTask {
  #[serde(deserialize_with = "id_string")]
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub description: Option<String>,
  // Either a label or a 1-5 number depending on the server
  #[serde(default)]
  pub priority: Option<Value>,
  #[serde(rename = "columnId", deserialize_with = "id_string")]
  pub column_id: String,
  #[serde(rename = "updatedAt")]
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ApiComment {
  #[serde(deserialize_with = "id_string")]
  pub id: String,
  #[serde(rename = "authorName", default)]
  pub author_name: String,
  pub body: String,
  #[serde(rename = "createdAt")]
  pub created_at: DateTime<Utc>,
}

// ============================================================================
// Response envelopes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiBoardsResponse {
  #[serde(default)]
  pub boards: Vec<ApiBoard>,
}

#[derive(Debug, Deserialize)]
pub struct ApiColumnsResponse {
  #[serde(default)]
  pub columns: Vec<ApiColumn>,
}

#[derive(Debug, Deserialize)]
pub struct ApiTaskPageResponse {
  #[serde(default)]
  pub items: Vec<ApiTask>,
  #[serde(default = "first_page")]
  pub page: u32,
  #[serde(default)]
  pub limit: u32,
  #[serde(default)]
  pub total: u64,
}

#[derive(Debug, Deserialize)]
pub struct ApiTaskResponse {
  pub task: ApiTask,
}

#[derive(Debug, Deserialize)]
pub struct ApiCommentsResponse {
  #[serde(default)]
  pub comments: Vec<ApiComment>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCommentResponse {
  pub comment: ApiComment,
}

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ApiCreateTask<'a> {
  pub title: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<&'a str>,
  pub priority: Priority,
}

impl<'a> From<&'a NewTask> for ApiCreateTask<'a> {
  fn from(task: &'a NewTask) -> Self {
    Self {
      title: &task.title,
      description: task.description.as_deref(),
      priority: task.priority,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct ApiUpdateTask<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority: Option<Priority>,
  #[serde(rename = "columnId", skip_serializing_if = "Option::is_none")]
  pub column_id: Option<&'a str>,
}

impl<'a> From<&'a TaskPatch> for ApiUpdateTask<'a> {
  fn from(patch: &'a TaskPatch) -> Self {
    Self {
      title: patch.title.as_deref(),
      description: patch.description.as_deref(),
      priority: patch.priority,
      column_id: patch.column_id.as_deref(),
    }
  }
}

#[derive(Debug, Serialize)]
pub struct ApiCreateComment<'a> {
  #[serde(rename = "authorName")]
  pub author_name: &'a str,
  pub body: &'a str,
}

impl<'a> From<&'a NewComment> for ApiCreateComment<'a> {
  fn from(comment: &'a NewComment) -> Self {
    Self {
      author_name: &comment.author_name,
      body: &comment.body,
    }
  }
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl From<ApiBoard> for Board {
  fn from(board: ApiBoard) -> Self {
    Board {
      id: board.id,
      name: board.name,
    }
  }
}

impl From<ApiColumn> for Column {
  fn from(col: ApiColumn) -> Self {
    Column {
      id: col.id,
      name: col.name,
      task_count: col.task_count,
    }
  }
}

impl From<ApiTask> for Task {
  fn from(task: ApiTask) -> Self {
    Task {
      priority: Priority::from(&RawPriority::from_json(task.priority.as_ref())),
      id: task.id,
      title: task.title,
      description: task.description,
      column_id: task.column_id,
      updated_at: task.updated_at,
    }
  }
}

impl From<ApiComment> for Comment {
  fn from(comment: ApiComment) -> Self {
    Comment {
      id: comment.id,
      author_name: comment.author_name,
      body: comment.body,
      created_at: comment.created_at,
    }
  }
}

impl From<ApiTaskPageResponse> for TaskPage {
  fn from(response: ApiTaskPageResponse) -> Self {
    TaskPage {
      items: response.items.into_iter().map(Task::from).collect(),
      page: response.page,
      limit: response.limit,
      total: response.total,
    }
  }
}
