//! Query keys and cached payloads for the board API.

use crate::cache::QueryKey;

use super::types::{Board, BoardId, Column, Comment, TaskId, TaskListParams, TaskPage};

// ============================================================================
// Query key types
// ============================================================================

/// Query keys for board API reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoardQueryKey {
  /// All boards
  Boards,
  /// Columns of a board; `None` until a board has been resolved
  Columns { board_id: Option<BoardId> },
  /// One page of a column's tasks, filtered by search text
  Tasks(TaskListParams),
  /// Comments on a task
  Comments { task_id: TaskId },
}

/// Resource families, for invalidating every key of a kind at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
  Boards,
  Columns,
  Tasks,
  Comments,
}

impl QueryKey for BoardQueryKey {
  type Kind = ResourceKind;

  fn kind(&self) -> ResourceKind {
    match self {
      Self::Boards => ResourceKind::Boards,
      Self::Columns { .. } => ResourceKind::Columns,
      Self::Tasks(_) => ResourceKind::Tasks,
      Self::Comments { .. } => ResourceKind::Comments,
    }
  }

  fn description(&self) -> String {
    match self {
      Self::Boards => "all boards".to_string(),
      Self::Columns { board_id } => match board_id {
        Some(id) => format!("columns of board {}", id),
        None => "columns of unresolved board".to_string(),
      },
      Self::Tasks(params) => {
        if params.search.is_empty() {
          format!("column {} tasks (page {})", params.column_id, params.page)
        } else {
          format!(
            "column {} tasks matching '{}' (page {})",
            params.column_id, params.search, params.page
          )
        }
      }
      Self::Comments { task_id } => format!("comments on task {}", task_id),
    }
  }
}

// ============================================================================
// Cached payloads
// ============================================================================

/// Result of any board API read, as stored in the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
  Boards(Vec<Board>),
  Columns(Vec<Column>),
  Tasks(TaskPage),
  Comments(Vec<Comment>),
}

impl QueryData {
  pub fn boards(&self) -> Option<&[Board]> {
    match self {
      QueryData::Boards(boards) => Some(boards),
      _ => None,
    }
  }

  pub fn columns(&self) -> Option<&[Column]> {
    match self {
      QueryData::Columns(columns) => Some(columns),
      _ => None,
    }
  }

  pub fn tasks(&self) -> Option<&TaskPage> {
    match self {
      QueryData::Tasks(page) => Some(page),
      _ => None,
    }
  }

  pub fn comments(&self) -> Option<&[Comment]> {
    match self {
      QueryData::Comments(comments) => Some(comments),
      _ => None,
    }
  }
}
