use async_trait::async_trait;
use common::{ConnectionStatus, DataPoint, Record, RecordId, RecordInput};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

pub use reqwest::StatusCode;

pub type TransportResult<T> = Result<T, TransportError>;

/// Every way a single request against the record store can fail.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{method} {url} failed: {source}")]
    Request {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} returned {status}")]
    Status {
        method: &'static str,
        url: String,
        status: StatusCode,
    },

    #[error("{method} {url} returned an undecodable body: {source}")]
    Decode {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned a malformed payload: {detail}")]
    Malformed { url: String, detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub items_path: String,
    pub data_path: String,
    pub status_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            items_path: "/items".to_string(),
            data_path: "/data".to_string(),
            status_path: "/status".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    fn join(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.is_empty() {
            return base.to_string();
        }
        format!("{base}/{}", path.trim_start_matches('/'))
    }

    pub fn items_url(&self) -> String {
        self.join(&self.items_path)
    }

    pub fn item_url(&self, id: RecordId) -> String {
        format!("{}/{id}", self.items_url().trim_end_matches('/'))
    }

    pub fn data_url(&self) -> String {
        self.join(&self.data_path)
    }

    pub fn status_url(&self) -> String {
        self.join(&self.status_path)
    }
}

/// The operations the collection synchronizer needs from a record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(&self) -> TransportResult<Vec<Record>>;
    async fn get(&self, id: RecordId) -> TransportResult<Record>;
    async fn create(&self, input: &RecordInput) -> TransportResult<Record>;
    async fn update(&self, id: RecordId, input: &RecordInput) -> TransportResult<Record>;
    async fn delete(&self, id: RecordId) -> TransportResult<()>;
}

/// HTTP client for the remote record store. One request per call, no retries.
#[derive(Clone)]
pub struct RecordClient {
    http: Client,
    config: ClientConfig,
}

impl RecordClient {
    pub fn new(server_base_url: impl Into<String>) -> Self {
        Self::with_config(ClientConfig::new(server_base_url))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn data_points(&self) -> TransportResult<Vec<DataPoint>> {
        let url = self.config.data_url();
        let response = send("GET", &url, self.http.get(&url)).await?;
        let payload = read_json::<serde_json::Value>("GET", &url, response).await?;
        decode_sequence(&url, payload)
    }

    pub async fn status(&self) -> TransportResult<ConnectionStatus> {
        let url = self.config.status_url();
        let response = send("GET", &url, self.http.get(&url)).await?;
        read_json("GET", &url, response).await
    }
}

#[async_trait]
impl RecordStore for RecordClient {
    async fn list(&self) -> TransportResult<Vec<Record>> {
        let url = self.config.items_url();
        let response = send("GET", &url, self.http.get(&url)).await?;
        let payload = read_json::<serde_json::Value>("GET", &url, response).await?;
        decode_sequence(&url, payload)
    }

    async fn get(&self, id: RecordId) -> TransportResult<Record> {
        let url = self.config.item_url(id);
        let response = send("GET", &url, self.http.get(&url)).await?;
        read_json("GET", &url, response).await
    }

    async fn create(&self, input: &RecordInput) -> TransportResult<Record> {
        let url = self.config.items_url();
        let response = send("POST", &url, self.http.post(&url).json(input)).await?;
        read_json("POST", &url, response).await
    }

    async fn update(&self, id: RecordId, input: &RecordInput) -> TransportResult<Record> {
        let url = self.config.item_url(id);
        let response = send("PUT", &url, self.http.put(&url).json(input)).await?;
        read_json("PUT", &url, response).await
    }

    async fn delete(&self, id: RecordId) -> TransportResult<()> {
        let url = self.config.item_url(id);
        send("DELETE", &url, self.http.delete(&url)).await?;
        Ok(())
    }
}

async fn send(
    method: &'static str,
    url: &str,
    request: reqwest::RequestBuilder,
) -> TransportResult<Response> {
    debug!(%method, %url, "sending request");
    let response = request
        .send()
        .await
        .map_err(|source| TransportError::Request {
            method,
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Status {
            method,
            url: url.to_string(),
            status,
        });
    }

    Ok(response)
}

async fn read_json<T: DeserializeOwned>(
    method: &'static str,
    url: &str,
    response: Response,
) -> TransportResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|source| TransportError::Decode {
            method,
            url: url.to_string(),
            source,
        })
}

/// Accepts only a JSON array whose every element decodes as `T`.
pub fn decode_sequence<T: DeserializeOwned>(
    url: &str,
    payload: serde_json::Value,
) -> TransportResult<Vec<T>> {
    if !payload.is_array() {
        return Err(TransportError::Malformed {
            url: url.to_string(),
            detail: format!("expected an array, got {}", json_kind(&payload)),
        });
    }

    serde_json::from_value(payload).map_err(|err| TransportError::Malformed {
        url: url.to_string(),
        detail: err.to_string(),
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
