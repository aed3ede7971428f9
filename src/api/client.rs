use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::api::api_types::{
  ApiBoardsResponse, ApiColumnsResponse, ApiCommentResponse, ApiCommentsResponse,
  ApiCreateComment, ApiCreateTask, ApiTaskPageResponse, ApiTaskResponse, ApiUpdateTask,
};
use crate::api::cache::{BoardQueryKey, QueryData};
use crate::api::invalidation::{Entity, Mutation};
use crate::api::transport::{ApiRequest, Transport};
use crate::api::types::{
  Board, Column, Comment, NewComment, NewTask, Task, TaskListParams, TaskPage, TaskPatch,
};
use crate::error::ApiError;

/// Typed board API over any transport
#[derive(Clone)]
pub struct BoardApi {
  transport: Arc<dyn Transport>,
}

impl BoardApi {
  pub fn new(transport: Arc<dyn Transport>) -> Self {
    Self { transport }
  }

  async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
    let value = self.transport.request(request).await?;
    Ok(serde_json::from_value(value)?)
  }

  fn to_body(body: impl serde::Serialize) -> Result<Value, ApiError> {
    Ok(serde_json::to_value(body)?)
  }

  /// Get all boards
  pub async fn list_boards(&self) -> Result<Vec<Board>, ApiError> {
    let response: ApiBoardsResponse = self.call(ApiRequest::get(&["boards"])).await?;
    Ok(response.boards.into_iter().map(Board::from).collect())
  }

  /// Get the columns of a board, with their task counts
  pub async fn list_columns(&self, board_id: &str) -> Result<Vec<Column>, ApiError> {
    let request = ApiRequest::get(&["boards", board_id, "columns"]);
    let response: ApiColumnsResponse = self.call(request).await?;
    Ok(response.columns.into_iter().map(Column::from).collect())
  }

  /// Get one page of a column's tasks
  pub async fn list_tasks(&self, params: &TaskListParams) -> Result<TaskPage, ApiError> {
    let mut request = ApiRequest::get(&["columns", params.column_id.as_str(), "tasks"]);
    if !params.search.is_empty() {
      request = request.with_query("search", &params.search);
    }
    let request = request
      .with_query("page", params.page)
      .with_query("limit", params.limit);

    let response: ApiTaskPageResponse = self.call(request).await?;
    Ok(response.into())
  }

  pub async fn create_task(&self, column_id: &str, task: &NewTask) -> Result<Task, ApiError> {
    let body = Self::to_body(ApiCreateTask::from(task))?;
    let request = ApiRequest::post(&["columns", column_id, "tasks"], body);
    let response: ApiTaskResponse = self.call(request).await?;
    Ok(response.task.into())
  }

  /// Update task fields; a `column_id` in the patch moves the task
  pub async fn update_task(&self, task_id: &str, patch: &TaskPatch) -> Result<Task, ApiError> {
    let body = Self::to_body(ApiUpdateTask::from(patch))?;
    let response: ApiTaskResponse = self.call(ApiRequest::patch(&["tasks", task_id], body)).await?;
    Ok(response.task.into())
  }

  pub async fn delete_task(&self, task_id: &str) -> Result<(), ApiError> {
    self.transport.request(ApiRequest::delete(&["tasks", task_id])).await?;
    Ok(())
  }

  pub async fn list_comments(&self, task_id: &str) -> Result<Vec<Comment>, ApiError> {
    let request = ApiRequest::get(&["tasks", task_id, "comments"]);
    let response: ApiCommentsResponse = self.call(request).await?;
    Ok(response.comments.into_iter().map(Comment::from).collect())
  }

  pub async fn add_comment(&self, task_id: &str, comment: &NewComment) -> Result<Comment, ApiError> {
    let body = Self::to_body(ApiCreateComment::from(comment))?;
    let request = ApiRequest::post(&["tasks", task_id, "comments"], body);
    let response: ApiCommentResponse = self.call(request).await?;
    Ok(response.comment.into())
  }

  /// Run the read a query key stands for.
  pub async fn load(&self, key: &BoardQueryKey) -> Result<QueryData, ApiError> {
    match key {
      BoardQueryKey::Boards => self.list_boards().await.map(QueryData::Boards),
      BoardQueryKey::Columns { board_id } => match board_id {
        Some(id) => self.list_columns(id).await.map(QueryData::Columns),
        // Only reachable if a caller enables the query before a board is
        // resolved: there is nothing to list yet.
        None => Ok(QueryData::Columns(Vec::new())),
      },
      BoardQueryKey::Tasks(params) => self.list_tasks(params).await.map(QueryData::Tasks),
      BoardQueryKey::Comments { task_id } => {
        self.list_comments(task_id).await.map(QueryData::Comments)
      }
    }
  }

  /// Send the write a mutation stands for.
  pub async fn apply(&self, mutation: &Mutation) -> Result<Entity, ApiError> {
    match mutation {
      Mutation::CreateTask { column_id, task } => {
        self.create_task(column_id, task).await.map(Entity::Task)
      }
      Mutation::UpdateTask { task_id, patch } => {
        self.update_task(task_id, patch).await.map(Entity::Task)
      }
      Mutation::DeleteTask { task_id } => {
        self.delete_task(task_id).await?;
        Ok(Entity::TaskDeleted(task_id.clone()))
      }
      Mutation::AddComment { task_id, comment } => {
        self.add_comment(task_id, comment).await.map(Entity::Comment)
      }
    }
  }
}
