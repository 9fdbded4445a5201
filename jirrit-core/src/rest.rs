//! # REST Envelope
//!
//! One HTTP exchange per call: attach credentials, send, classify the status,
//! strip the server's magic prefix and decode the JSON top level into a map or
//! a sequence. Retries belong to the workflow engines, not here.

use std::fmt;
use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, trace, warn};
use url::Url;

use crate::auth::{AuthInfo, AuthKind};

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("jirrit/", env!("CARGO_PKG_VERSION"));

/// Transport and status failures
#[derive(Debug, Error)]
pub enum RestError {
  #[error("authentication failed (HTTP {status})")]
  Auth { status: u16, body: String },

  #[error("connection failed: {0}")]
  Connection(String),

  #[error("request could not be built: {0}")]
  Config(String),

  #[error("request rejected as malformed (HTTP 400)")]
  BadRequest { body: String },

  #[error("not found (HTTP 404)")]
  NotFound { body: String },

  #[error("server error (HTTP {status})")]
  Server { status: u16, body: String },

  #[error("unexpected response: HTTP {status}")]
  Status { status: u16, body: String },

  #[error("response is not valid JSON: {message}")]
  Decode { message: String, body: String },

  #[error("expected a JSON {expected} but got {found}")]
  Shape { expected: &'static str, found: &'static str },
}

impl RestError {
  /// Classify a non-success status
  pub fn from_status(status: StatusCode, body: String) -> Self {
    let code = status.as_u16();
    match status {
      StatusCode::BAD_REQUEST => Self::BadRequest { body },
      StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Auth { status: code, body },
      StatusCode::NOT_FOUND => Self::NotFound { body },
      StatusCode::GATEWAY_TIMEOUT => Self::Connection(format!("HTTP {} - {}", code, body)),
      s if s.is_server_error() => Self::Server { status: code, body },
      _ => Self::Status { status: code, body },
    }
  }

  /// Response body text, when the failure carried one
  pub fn body(&self) -> Option<&str> {
    match self {
      Self::Auth { body, .. }
      | Self::BadRequest { body }
      | Self::NotFound { body }
      | Self::Server { body, .. }
      | Self::Status { body, .. }
      | Self::Decode { body, .. } => Some(body),
      Self::Connection(_) | Self::Config(_) | Self::Shape { .. } => None,
    }
  }

  pub fn exit_code(&self) -> i32 {
    match self {
      Self::Config(_) => 1,
      Self::Auth { .. } => 2,
      Self::Connection(_) => 3,
      Self::NotFound { .. } | Self::Decode { .. } | Self::Shape { .. } => 5,
      Self::BadRequest { .. } => 6,
      Self::Server { .. } | Self::Status { .. } => 7,
    }
  }
}

impl From<reqwest::Error> for RestError {
  fn from(err: reqwest::Error) -> Self {
    let err = err.without_url();
    if err.is_builder() {
      Self::Config(err.to_string())
    } else {
      Self::Connection(err.to_string())
    }
  }
}

/// Decoded top-level response
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
  Map(Map<String, Value>),
  Seq(Vec<Value>),
  Scalar(Value),
}

impl Payload {
  const fn kind(&self) -> &'static str {
    match self {
      Payload::Map(_) => "map",
      Payload::Seq(_) => "sequence",
      Payload::Scalar(_) => "scalar",
    }
  }

  /// Every map in the payload: the map itself, or the maps of a sequence
  pub fn into_maps(self) -> Vec<Map<String, Value>> {
    match self {
      Payload::Map(map) => vec![map],
      Payload::Seq(items) => items
        .into_iter()
        .filter_map(|item| match item {
          Value::Object(map) => Some(map),
          _ => None,
        })
        .collect(),
      Payload::Scalar(_) => Vec::new(),
    }
  }
}

/// `url` with every query value masked. Query strings can carry API keys, so
/// only the masked form is logged.
pub fn redact_query(url: &str) -> String {
  match Url::parse(url) {
    Ok(mut parsed) if parsed.query().is_some() => {
      let names: Vec<String> = parsed.query_pairs().map(|(name, _)| name.into_owned()).collect();
      parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(names.iter().map(|name| (name.as_str(), "***")));
      parsed.to_string()
    }
    Ok(_) => url.to_string(),
    Err(_) => url.split_once('?').map_or(url, |(base, _)| base).to_string(),
  }
}

/// One finished exchange, as seen by a [`RestObserver`]. The URL is already
/// masked with [`redact_query`].
pub struct Exchange<'a> {
  pub method: &'a Method,
  pub url: &'a str,
  pub status: Option<u16>,
  pub request_body: Option<&'a Value>,
  pub response_body: &'a [u8],
}

impl fmt::Debug for Exchange<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Exchange")
      .field("method", self.method)
      .field("url", &self.url)
      .field("status", &self.status)
      .finish()
  }
}

/// Hook called after every REST exchange
pub trait RestObserver: Send + Sync {
  fn observe(&self, exchange: &Exchange<'_>);
}

/// Logs bodies at trace level
#[derive(Debug, Default)]
pub struct TracingObserver;

impl RestObserver for TracingObserver {
  fn observe(&self, exchange: &Exchange<'_>) {
    if let Some(body) = exchange.request_body {
      trace!("{} {} request body: {}", exchange.method, exchange.url, body);
    }
    trace!(
      "{} {} -> {:?}: {}",
      exchange.method,
      exchange.url,
      exchange.status,
      String::from_utf8_lossy(exchange.response_body)
    );
  }
}

/// HTTP client bound to one server's credentials and magic prefix
#[derive(Clone)]
pub struct RestClient {
  client: Client,
  auth: AuthInfo,
  magic: String,
  observer: Arc<dyn RestObserver>,
}

impl fmt::Debug for RestClient {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RestClient")
      .field("user", &self.auth.user)
      .field("kind", &self.auth.kind)
      .field("magic", &self.magic)
      .finish()
  }
}

impl RestClient {
  /// Create a client for the given credentials and magic prefix
  pub fn new(auth: AuthInfo, magic: &str) -> Self {
    let client = Client::builder()
      .user_agent(USER_AGENT)
      .build()
      .unwrap_or_else(|err| {
        warn!("Falling back to default HTTP client: {}", err);
        Client::new()
      });
    Self {
      client,
      auth,
      magic: magic.to_string(),
      observer: Arc::new(TracingObserver),
    }
  }

  /// Replace the post-exchange observer
  pub fn with_observer(mut self, observer: Arc<dyn RestObserver>) -> Self {
    self.observer = observer;
    self
  }

  pub fn auth(&self) -> &AuthInfo {
    &self.auth
  }

  fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
    match self.auth.kind {
      AuthKind::Basic | AuthKind::Digest => builder.basic_auth(&self.auth.user, Some(&self.auth.secret)),
      AuthKind::Plain => builder.header(AUTHORIZATION, format!("Basic {}", self.auth.secret)),
      AuthKind::None => builder,
    }
  }

  async fn finish(
    &self,
    method: &Method,
    url: &str,
    body: Option<&Value>,
    builder: RequestBuilder,
  ) -> Result<Vec<u8>, RestError> {
    let shown = redact_query(url);
    debug!("{} {}", method, shown);
    let response = match self.authorize(builder).send().await {
      Ok(response) => response,
      Err(err) => {
        let err = RestError::from(err);
        warn!("REST error on {} {}: {}", method, shown, err);
        return Err(err);
      }
    };

    let status = response.status();
    let bytes = response.bytes().await.map_err(RestError::from)?.to_vec();
    self.observer.observe(&Exchange {
      method,
      url: &shown,
      status: Some(status.as_u16()),
      request_body: body,
      response_body: &bytes,
    });

    if status.is_success() {
      return Ok(bytes);
    }

    let text = String::from_utf8_lossy(&bytes).into_owned();
    warn!("REST error on {} {}: HTTP {}", method, shown, status);
    debug!("REST error body: {}", text);
    Err(RestError::from_status(status, text))
  }

  /// Send a request with an optional JSON body and return the raw payload
  pub async fn exchange(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Vec<u8>, RestError> {
    let mut builder = self.client.request(method.clone(), url);
    if let Some(body) = body {
      builder = builder.json(body);
    }
    self.finish(&method, url, body, builder).await
  }

  /// Decode a response body after stripping the magic prefix
  pub fn decode(&self, bytes: &[u8]) -> Result<Payload, RestError> {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim_start();
    let stripped = if self.magic.is_empty() {
      trimmed
    } else {
      trimmed.strip_prefix(self.magic.as_str()).unwrap_or(trimmed)
    };
    if stripped.trim().is_empty() {
      return Ok(Payload::Map(Map::new()));
    }

    match serde_json::from_str::<Value>(stripped) {
      Ok(Value::Object(map)) => Ok(Payload::Map(map)),
      Ok(Value::Array(items)) => Ok(Payload::Seq(items)),
      Ok(other) => Ok(Payload::Scalar(other)),
      Err(err) => Err(RestError::Decode {
        message: err.to_string(),
        body: stripped.to_string(),
      }),
    }
  }

  /// Accept any JSON top level
  pub async fn rest_sth(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Payload, RestError> {
    let bytes = self.exchange(method, url, body).await?;
    self.decode(&bytes)
  }

  /// Expect a JSON object
  pub async fn rest_map(
    &self,
    method: Method,
    url: &str,
    body: Option<&Value>,
  ) -> Result<Map<String, Value>, RestError> {
    match self.rest_sth(method, url, body).await? {
      Payload::Map(map) => Ok(map),
      other => Err(RestError::Shape {
        expected: "map",
        found: other.kind(),
      }),
    }
  }

  /// Expect a JSON array
  pub async fn rest_slc(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Vec<Value>, RestError> {
    match self.rest_sth(method, url, body).await? {
      Payload::Seq(items) => Ok(items),
      other => Err(RestError::Shape {
        expected: "sequence",
        found: other.kind(),
      }),
    }
  }

  /// Non-JSON endpoints: console text, attachment content
  pub async fn rest_bytes(&self, method: Method, url: &str) -> Result<Vec<u8>, RestError> {
    self.exchange(method, url, None).await
  }

  /// Multipart upload of one file under the form field `file`
  pub async fn upload(
    &self,
    url: &str,
    file_name: &str,
    content: Vec<u8>,
    headers: &[(&'static str, &'static str)],
  ) -> Result<Payload, RestError> {
    let mut header_map = HeaderMap::new();
    for (name, value) in headers {
      header_map.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    let form = Form::new().part("file", Part::bytes(content).file_name(file_name.to_string()));
    let builder = self.client.post(url).headers(header_map).multipart(form);
    let bytes = self.finish(&Method::POST, url, None, builder).await?;
    self.decode(&bytes)
  }
}
