//! Request execution seam between the sync layer and the network.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::config::Config;
use crate::error::ApiError;

/// A request against the board API, relative to its base URL.
///
/// The path is kept as raw segments (ids included) and only encoded by the
/// transport, so an id can never change which resource is addressed.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method: Method,
  pub segments: Vec<String>,
  pub query: Vec<(String, String)>,
  pub body: Option<Value>,
}

impl ApiRequest {
  pub fn new(method: Method, segments: &[&str]) -> Self {
    Self {
      method,
      segments: segments.iter().map(|s| s.to_string()).collect(),
      query: Vec::new(),
      body: None,
    }
  }

  pub fn get(segments: &[&str]) -> Self {
    Self::new(Method::GET, segments)
  }

  pub fn post(segments: &[&str], body: Value) -> Self {
    Self::new(Method::POST, segments).with_body(body)
  }

  pub fn patch(segments: &[&str], body: Value) -> Self {
    Self::new(Method::PATCH, segments).with_body(body)
  }

  pub fn delete(segments: &[&str]) -> Self {
    Self::new(Method::DELETE, segments)
  }

  /// Unencoded path, for logs.
  pub fn path(&self) -> String {
    self.segments.join("/")
  }

  pub fn with_query(mut self, name: &str, value: impl ToString) -> Self {
    self.query.push((name.to_string(), value.to_string()));
    self
  }

  pub fn with_body(mut self, body: Value) -> Self {
    self.body = Some(body);
    self
  }
}

/// Executes API requests. Success yields the decoded JSON body
/// (`Value::Null` for an empty body).
#[async_trait]
pub trait Transport: Send + Sync {
  async fn request(&self, request: ApiRequest) -> Result<Value, ApiError>;
}

/// HTTP transport over reqwest.
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
  base_url: Url,
  token: Option<String>,
}

impl HttpTransport {
  pub fn new(config: &Config) -> Result<Self> {
    let base_url = Url::parse(&config.api.url)
      .map_err(|e| eyre!("Invalid API url {}: {}", config.api.url, e))?;
    Ok(Self::with_base_url(base_url, Config::get_api_token()))
  }

  pub fn with_base_url(base_url: Url, token: Option<String>) -> Self {
    Self {
      client: reqwest::Client::new(),
      base_url,
      token,
    }
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn request(&self, request: ApiRequest) -> Result<Value, ApiError> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| ApiError::Network(format!("API url {} cannot take a path", self.base_url)))?
      .pop_if_empty()
      .extend(&request.segments);
    if !request.query.is_empty() {
      url.query_pairs_mut().extend_pairs(&request.query);
    }

    let mut builder = self.client.request(request.method, url);
    if let Some(token) = &self.token {
      builder = builder.bearer_auth(token);
    }
    if let Some(body) = &request.body {
      builder = builder
        .header(CONTENT_TYPE, "application/json")
        .body(serde_json::to_vec(body)?);
    }

    let response = builder
      .send()
      .await
      .map_err(|e| ApiError::Network(e.to_string()))?;
    let status = response.status();
    let bytes = response
      .bytes()
      .await
      .map_err(|e| ApiError::Network(e.to_string()))?;

    if !status.is_success() {
      return Err(ApiError::Status {
        status: status.as_u16(),
        body: String::from_utf8_lossy(&bytes).into_owned(),
      });
    }
    if bytes.iter().all(u8::is_ascii_whitespace) {
      return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
  }
}
