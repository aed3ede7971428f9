//! Board data sync: cached reads and invalidating writes for the board API.
//!
//! This is the surface the presentation layer talks to. Reads return cache
//! entry snapshots and keep them fresh; writes go straight to the server and,
//! once confirmed, invalidate every query they affect.

use std::future::Future;
use std::sync::Arc;
use tracing::info;

use crate::api::cache::{BoardQueryKey, QueryData};
use crate::api::client::BoardApi;
use crate::api::invalidation::{Entity, Mutation};
use crate::api::transport::{HttpTransport, Transport};
use crate::api::types::{
  Board, BoardId, Column, Comment, NewComment, NewTask, Task, TaskListParams, TaskPage, TaskPatch,
};
use crate::cache::{CacheEntry, QueryKey};
use crate::config::Config;
use crate::error::{ApiError, FetchError, MutationError};
use crate::mutation::MutationCoordinator;
use crate::query::{QueryClient, QueryObserver};

pub type BoardEntry = CacheEntry<BoardQueryKey, QueryData>;
pub type BoardObserver = QueryObserver<BoardQueryKey, QueryData>;

#[derive(Debug, Clone)]
pub struct SyncSettings {
  /// Board to make active when resolving, if the server lists it
  pub default_board: Option<BoardId>,
  /// `limit` for task-list queries
  pub page_size: u32,
}

impl Default for SyncSettings {
  fn default() -> Self {
    Self {
      default_board: None,
      page_size: 20,
    }
  }
}

impl From<&Config> for SyncSettings {
  fn from(config: &Config) -> Self {
    Self {
      default_board: config.default_board.clone(),
      page_size: config.tasks.page_size,
    }
  }
}

/// Cached board client.
///
/// Clones share one cache. The active board is per clone: it drives the
/// column query and gates task queries until it is known.
#[derive(Clone)]
pub struct BoardSync {
  api: BoardApi,
  queries: QueryClient<BoardQueryKey, QueryData>,
  mutations: MutationCoordinator<BoardQueryKey, QueryData>,
  settings: SyncSettings,
  active_board: Option<BoardId>,
}

impl BoardSync {
  pub fn new(transport: Arc<dyn Transport>, settings: SyncSettings) -> Self {
    let queries = QueryClient::new();
    Self {
      api: BoardApi::new(transport),
      mutations: MutationCoordinator::new(queries.clone()),
      queries,
      settings,
      active_board: None,
    }
  }

  /// Create a client talking HTTP to the configured API.
  pub fn from_config(config: &Config) -> color_eyre::Result<Self> {
    let transport = HttpTransport::new(config)?;
    Ok(Self::new(Arc::new(transport), SyncSettings::from(config)))
  }

  pub fn queries(&self) -> &QueryClient<BoardQueryKey, QueryData> {
    &self.queries
  }

  pub fn active_board(&self) -> Option<&BoardId> {
    self.active_board.as_ref()
  }

  pub fn set_active_board(&mut self, board_id: Option<BoardId>) {
    self.active_board = board_id;
  }

  /// Load the boards and pick the active one: the configured default if the
  /// server lists it, otherwise the first board.
  pub async fn resolve_active_board(&mut self) -> Result<Option<Board>, FetchError> {
    let boards = self.load_boards().await?;
    let board = self
      .settings
      .default_board
      .as_ref()
      .and_then(|wanted| boards.iter().find(|b| &b.id == wanted))
      .or_else(|| boards.first())
      .cloned();

    if let Some(board) = &board {
      info!(board = %board.id, name = %board.name, "active board resolved");
    }
    self.active_board = board.as_ref().map(|b| b.id.clone());
    Ok(board)
  }

  /// Task-list parameters for the first page of `column_id`.
  pub fn task_params(&self, column_id: &str, search: &str) -> TaskListParams {
    TaskListParams::new(column_id, search, self.settings.page_size)
  }

  // ==========================================================================
  // Reads
  // ==========================================================================

  fn ensure(&self, key: BoardQueryKey, enabled: bool) -> BoardEntry {
    let api = self.api.clone();
    let fetch_key = key.clone();
    self.queries.ensure_fresh(
      key,
      move || {
        let api = api.clone();
        let key = fetch_key.clone();
        async move { api.load(&key).await }
      },
      enabled,
    )
  }

  pub fn boards(&self) -> BoardEntry {
    self.ensure(BoardQueryKey::Boards, true)
  }

  /// Columns of the active board; idle until a board is resolved.
  pub fn columns(&self) -> BoardEntry {
    let board_id = self.active_board.clone();
    let enabled = board_id.is_some();
    self.ensure(BoardQueryKey::Columns { board_id }, enabled)
  }

  /// Tasks of one column; idle until a board is resolved.
  pub fn tasks(&self, params: TaskListParams) -> BoardEntry {
    self.ensure(BoardQueryKey::Tasks(params), self.active_board.is_some())
  }

  pub fn comments(&self, task_id: &str) -> BoardEntry {
    let key = BoardQueryKey::Comments {
      task_id: task_id.to_string(),
    };
    self.ensure(key, true)
  }

  /// Follow a query whose key changes over time (e.g. a search box).
  pub fn observe(&self, key: BoardQueryKey, enabled: bool) -> BoardObserver {
    let api = self.api.clone();
    QueryObserver::new(self.queries.clone(), key, enabled, move |key| {
      let api = api.clone();
      let key = key.clone();
      async move { api.load(&key).await }
    })
  }

  pub fn observe_tasks(&self, params: TaskListParams) -> BoardObserver {
    self.observe(BoardQueryKey::Tasks(params), self.active_board.is_some())
  }

  /// Ensure `key` is fresh and wait for its data.
  async fn load(&self, key: BoardQueryKey) -> Result<Arc<QueryData>, FetchError> {
    self.ensure(key.clone(), true);
    let entry = self.queries.settled(&key).await;
    if let Some(err) = entry.error.filter(|_| entry.status.is_error()) {
      return Err(err);
    }
    entry.data.ok_or_else(|| FetchError {
      query: key.description(),
      source: ApiError::Network("query was cancelled".to_string()),
    })
  }

  fn unexpected(key: &BoardQueryKey) -> FetchError {
    FetchError {
      query: key.description(),
      source: ApiError::Decode("cached payload has the wrong shape".to_string()),
    }
  }

  pub async fn load_boards(&self) -> Result<Vec<Board>, FetchError> {
    let key = BoardQueryKey::Boards;
    let data = self.load(key.clone()).await?;
    data.boards().map(<[Board]>::to_vec).ok_or_else(|| Self::unexpected(&key))
  }

  /// Columns of the active board; empty when no board is active.
  pub async fn load_columns(&self) -> Result<Vec<Column>, FetchError> {
    if self.active_board.is_none() {
      return Ok(Vec::new());
    }
    let key = BoardQueryKey::Columns {
      board_id: self.active_board.clone(),
    };
    let data = self.load(key.clone()).await?;
    data.columns().map(<[Column]>::to_vec).ok_or_else(|| Self::unexpected(&key))
  }

  pub async fn load_tasks(&self, params: TaskListParams) -> Result<TaskPage, FetchError> {
    let key = BoardQueryKey::Tasks(params);
    let data = self.load(key.clone()).await?;
    data.tasks().cloned().ok_or_else(|| Self::unexpected(&key))
  }

  pub async fn load_comments(&self, task_id: &str) -> Result<Vec<Comment>, FetchError> {
    let key = BoardQueryKey::Comments {
      task_id: task_id.to_string(),
    };
    let data = self.load(key.clone()).await?;
    data.comments().map(<[Comment]>::to_vec).ok_or_else(|| Self::unexpected(&key))
  }

  // ==========================================================================
  // Writes
  // ==========================================================================

  async fn run<T, Fut>(&self, mutation: &Mutation, request: Fut) -> Result<T, MutationError>
  where
    Fut: Future<Output = Result<T, ApiError>>,
  {
    let patterns = mutation.invalidates(self.active_board.as_ref());
    self
      .mutations
      .perform(&mutation.action(), &patterns, request)
      .await
  }

  /// Send any write and invalidate what it affects.
  pub async fn perform(&self, mutation: Mutation) -> Result<Entity, MutationError> {
    self.run(&mutation, self.api.apply(&mutation)).await
  }

  pub async fn create_task(&self, column_id: &str, task: NewTask) -> Result<Task, MutationError> {
    let request = self.api.create_task(column_id, &task);
    let mutation = Mutation::CreateTask {
      column_id: column_id.to_string(),
      task: task.clone(),
    };
    self.run(&mutation, request).await
  }

  pub async fn update_task(&self, task_id: &str, patch: TaskPatch) -> Result<Task, MutationError> {
    let request = self.api.update_task(task_id, &patch);
    let mutation = Mutation::UpdateTask {
      task_id: task_id.to_string(),
      patch: patch.clone(),
    };
    self.run(&mutation, request).await
  }

  /// Move a task to another column. A single update, not delete + create.
  pub async fn move_task(&self, task_id: &str, column_id: &str) -> Result<Task, MutationError> {
    self.update_task(task_id, TaskPatch::move_to(column_id)).await
  }

  pub async fn delete_task(&self, task_id: &str) -> Result<(), MutationError> {
    let request = self.api.delete_task(task_id);
    let mutation = Mutation::DeleteTask {
      task_id: task_id.to_string(),
    };
    self.run(&mutation, request).await
  }

  pub async fn add_comment(
    &self,
    task_id: &str,
    comment: NewComment,
  ) -> Result<Comment, MutationError> {
    let request = self.api.add_comment(task_id, &comment);
    let mutation = Mutation::AddComment {
      task_id: task_id.to_string(),
      comment: comment.clone(),
    };
    self.run(&mutation, request).await
  }
}
