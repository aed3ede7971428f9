//! In-memory board API used by tests.

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::transport::{ApiRequest, Transport};
use crate::error::ApiError;

#[derive(Default)]
struct State {
  boards: Vec<Value>,
  /// (board id, column json)
  columns: Vec<(String, Value)>,
  tasks: Vec<Value>,
  /// (task id, comment json)
  comments: Vec<(String, Value)>,
  next_id: u32,
  log: Vec<String>,
  last_segments: Option<Vec<String>>,
}

/// Fake server speaking the board API's JSON shapes.
#[derive(Default)]
pub struct FakeServer {
  state: Mutex<State>,
  offline: AtomicBool,
}

impl FakeServer {
  /// Board b1 with columns Todo (c1) and Done (c2); task t1 "Write spec"
  /// sits in Todo with numeric priority 5.
  pub fn scenario() -> Self {
    let server = Self::default();
    {
      let mut state = server.state.lock().unwrap();
      state.boards.push(json!({"id": "b1", "name": "Roadmap"}));
      state
        .columns
        .push(("b1".to_string(), json!({"id": "c1", "name": "Todo"})));
      state
        .columns
        .push(("b1".to_string(), json!({"id": "c2", "name": "Done"})));
      state.tasks.push(json!({
        "id": "t1",
        "title": "Write spec",
        "priority": 5,
        "columnId": "c1",
        "updatedAt": "2024-05-01T10:00:00Z",
      }));
      state.next_id = 2;
    }
    server
  }

  pub fn add_board(&self, id: &str, name: &str) {
    let mut state = self.state.lock().unwrap();
    state.boards.push(json!({"id": id, "name": name}));
  }

  /// Make every request fail with a network error.
  pub fn set_offline(&self, offline: bool) {
    self.offline.store(offline, Ordering::SeqCst);
  }

  /// Requests received so far, as "METHOD path?query".
  pub fn requests(&self) -> Vec<String> {
    self.state.lock().unwrap().log.clone()
  }

  /// Path segments of the most recent request, as sent.
  pub fn last_segments(&self) -> Option<Vec<String>> {
    self.state.lock().unwrap().last_segments.clone()
  }

  pub fn clear_requests(&self) {
    self.state.lock().unwrap().log.clear();
  }

  fn handle(&self, request: &ApiRequest) -> Result<Value, ApiError> {
    let mut state = self.state.lock().unwrap();
    let query: Vec<String> = request
      .query
      .iter()
      .map(|(k, v)| format!("{}={}", k, v))
      .collect();
    let line = if query.is_empty() {
      format!("{} {}", request.method, request.path())
    } else {
      format!("{} {}?{}", request.method, request.path(), query.join("&"))
    };
    state.log.push(line);
    state.last_segments = Some(request.segments.clone());

    if self.offline.load(Ordering::SeqCst) {
      return Err(ApiError::Network("connection refused".to_string()));
    }

    let param = |name: &str| {
      request
        .query
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
    };
    let body = request.body.clone().unwrap_or(Value::Null);
    let segments: Vec<&str> = request.segments.iter().map(String::as_str).collect();

    match (request.method.as_str(), segments.as_slice()) {
      ("GET", ["boards"]) => Ok(json!({"boards": state.boards})),
      ("GET", ["boards", board_id, "columns"]) => {
        let columns: Vec<Value> = state
          .columns
          .iter()
          .filter(|(b, _)| b == board_id)
          .map(|(_, column)| {
            let count = state
              .tasks
              .iter()
              .filter(|t| t["columnId"] == column["id"])
              .count();
            let mut column = column.clone();
            column["taskCount"] = json!(count);
            column
          })
          .collect();
        Ok(json!({"columns": columns}))
      }
      ("GET", ["columns", column_id, "tasks"]) => {
        let search = param("search").unwrap_or_default().to_lowercase();
        let page: usize = param("page").and_then(|p| p.parse().ok()).unwrap_or(1);
        let limit: usize = param("limit").and_then(|l| l.parse().ok()).unwrap_or(20);
        let matching: Vec<Value> = state
          .tasks
          .iter()
          .filter(|t| t["columnId"] == *column_id)
          .filter(|t| {
            t["title"]
              .as_str()
              .map(|title| title.to_lowercase().contains(&search))
              .unwrap_or(false)
          })
          .cloned()
          .collect();
        let items: Vec<Value> = matching
          .iter()
          .skip((page.max(1) - 1) * limit)
          .take(limit)
          .cloned()
          .collect();
        Ok(json!({"items": items, "page": page, "limit": limit, "total": matching.len()}))
      }
      ("POST", ["columns", column_id, "tasks"]) => {
        let id = format!("t{}", state.next_id);
        let task = json!({
          "id": id,
          "title": body["title"],
          "description": body["description"],
          "priority": body["priority"],
          "columnId": column_id,
          "updatedAt": timestamp(state.next_id),
        });
        state.next_id += 1;
        state.tasks.push(task.clone());
        Ok(json!({"task": task}))
      }
      ("PATCH", ["tasks", task_id]) => {
        let stamp = timestamp(state.next_id);
        state.next_id += 1;
        let task = state
          .tasks
          .iter_mut()
          .find(|t| t["id"] == *task_id)
          .ok_or_else(not_found)?;
        if let Value::Object(fields) = &body {
          for (field, value) in fields {
            task[field.as_str()] = value.clone();
          }
        }
        task["updatedAt"] = json!(stamp);
        Ok(json!({"task": task.clone()}))
      }
      ("DELETE", ["tasks", task_id]) => {
        let before = state.tasks.len();
        state.tasks.retain(|t| t["id"] != *task_id);
        if state.tasks.len() == before {
          return Err(not_found());
        }
        Ok(Value::Null)
      }
      ("GET", ["tasks", task_id, "comments"]) => {
        let comments: Vec<Value> = state
          .comments
          .iter()
          .filter(|(t, _)| t == task_id)
          .map(|(_, c)| c.clone())
          .collect();
        Ok(json!({"comments": comments}))
      }
      ("POST", ["tasks", task_id, "comments"]) => {
        let comment = json!({
          "id": format!("m{}", state.next_id),
          "authorName": body["authorName"],
          "body": body["body"],
          "createdAt": timestamp(state.next_id),
        });
        state.next_id += 1;
        state.comments.push((task_id.to_string(), comment.clone()));
        Ok(json!({"comment": comment}))
      }
      _ => Err(not_found()),
    }
  }
}

fn not_found() -> ApiError {
  ApiError::Status {
    status: 404,
    body: "not found".to_string(),
  }
}

fn timestamp(seq: u32) -> String {
  let base = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
  (base + Duration::minutes(seq.into())).to_rfc3339()
}

#[async_trait]
impl Transport for FakeServer {
  async fn request(&self, request: ApiRequest) -> Result<Value, ApiError> {
    self.handle(&request)
  }
}
