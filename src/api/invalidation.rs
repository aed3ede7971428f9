//! Write operations and the queries each one makes stale.

use crate::cache::KeyPattern;

use super::cache::{BoardQueryKey, ResourceKind};
use super::types::{BoardId, ColumnId, Comment, NewComment, NewTask, Task, TaskId, TaskPatch};

/// A write against the board API.
///
/// Moving a task is an `UpdateTask` whose patch sets `column_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
  CreateTask { column_id: ColumnId, task: NewTask },
  UpdateTask { task_id: TaskId, patch: TaskPatch },
  DeleteTask { task_id: TaskId },
  AddComment { task_id: TaskId, comment: NewComment },
}

/// What the server returned for a confirmed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
  Task(Task),
  TaskDeleted(TaskId),
  Comment(Comment),
}

impl Mutation {
  /// Short description used in logs and errors.
  pub fn action(&self) -> String {
    match self {
      Mutation::CreateTask { column_id, .. } => format!("create task in column {}", column_id),
      Mutation::UpdateTask { task_id, patch } => match &patch.column_id {
        Some(column_id) => format!("move task {} to column {}", task_id, column_id),
        None => format!("update task {}", task_id),
      },
      Mutation::DeleteTask { task_id } => format!("delete task {}", task_id),
      Mutation::AddComment { task_id, .. } => format!("comment on task {}", task_id),
    }
  }

  /// Query patterns made stale once this write succeeds.
  ///
  /// | mutation            | invalidates                                 |
  /// |---------------------|---------------------------------------------|
  /// | create/update/delete | every task list, active board's column list |
  /// | add comment to T    | comments of T                               |
  ///
  /// Column task counts come from the column listing, so anything that can
  /// change them (including a move) refreshes it. Without an active board
  /// every column list is hit.
  pub fn invalidates(&self, active_board: Option<&BoardId>) -> Vec<KeyPattern<BoardQueryKey>> {
    match self {
      Mutation::CreateTask { .. } | Mutation::UpdateTask { .. } | Mutation::DeleteTask { .. } => {
        vec![KeyPattern::Kind(ResourceKind::Tasks), column_list(active_board)]
      }
      Mutation::AddComment { task_id, .. } => vec![KeyPattern::Exact(BoardQueryKey::Comments {
        task_id: task_id.clone(),
      })],
    }
  }
}

fn column_list(active_board: Option<&BoardId>) -> KeyPattern<BoardQueryKey> {
  match active_board {
    Some(id) => KeyPattern::Exact(BoardQueryKey::Columns {
      board_id: Some(id.clone()),
    }),
    None => KeyPattern::Kind(ResourceKind::Columns),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::{Priority, TaskListParams};

  fn board() -> BoardId {
    "b1".to_string()
  }

  fn task_key(column: &str) -> BoardQueryKey {
    BoardQueryKey::Tasks(TaskListParams::new(column, "", 20))
  }

  fn columns_key(board_id: &str) -> BoardQueryKey {
    BoardQueryKey::Columns {
      board_id: Some(board_id.to_string()),
    }
  }

  fn hits(patterns: &[KeyPattern<BoardQueryKey>], key: &BoardQueryKey) -> bool {
    patterns.iter().any(|p| p.matches(key))
  }

  #[test]
  fn test_create_task_invalidates_tasks_and_columns() {
    let mutation = Mutation::CreateTask {
      column_id: "c1".to_string(),
      task: NewTask {
        title: "x".to_string(),
        description: None,
        priority: Priority::Low,
      },
    };
    let patterns = mutation.invalidates(Some(&board()));
    assert!(hits(&patterns, &task_key("c1")));
    assert!(hits(&patterns, &task_key("c2")));
    assert!(hits(&patterns, &columns_key("b1")));
    assert!(!hits(&patterns, &columns_key("b2")));
    assert!(!hits(
      &patterns,
      &BoardQueryKey::Comments {
        task_id: "t1".to_string()
      }
    ));
  }

  #[test]
  fn test_move_invalidates_both_columns_and_counts() {
    let mutation = Mutation::UpdateTask {
      task_id: "t1".to_string(),
      patch: TaskPatch::move_to("c2"),
    };
    let patterns = mutation.invalidates(Some(&board()));
    assert!(hits(&patterns, &task_key("c1")));
    assert!(hits(&patterns, &task_key("c2")));
    assert!(hits(&patterns, &columns_key("b1")));
    assert_eq!(mutation.action(), "move task t1 to column c2");
  }

  #[test]
  fn test_comment_only_invalidates_its_task() {
    let mutation = Mutation::AddComment {
      task_id: "t1".to_string(),
      comment: NewComment {
        author_name: "ann".to_string(),
        body: "hi".to_string(),
      },
    };
    let patterns = mutation.invalidates(Some(&board()));
    assert_eq!(patterns.len(), 1);
    assert!(hits(
      &patterns,
      &BoardQueryKey::Comments {
        task_id: "t1".to_string()
      }
    ));
    assert!(!hits(
      &patterns,
      &BoardQueryKey::Comments {
        task_id: "t2".to_string()
      }
    ));
    assert!(!hits(&patterns, &task_key("c1")));
  }

  #[test]
  fn test_without_active_board_hits_all_column_lists() {
    let mutation = Mutation::DeleteTask {
      task_id: "t1".to_string(),
    };
    let patterns = mutation.invalidates(None);
    assert!(hits(&patterns, &columns_key("b1")));
    assert!(hits(&patterns, &columns_key("b2")));
  }
}
