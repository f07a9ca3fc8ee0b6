use std::time::Duration;

use reqwest::Method;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use super::types::{ClusterInfo, Document, IndexSpec, KnnQuery, SearchHit, SearchResponse};
use crate::config::EsConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors returned by the cluster client.
#[derive(Error, Debug)]
pub enum EsError {
    #[error("could not build HTTP client: {0}")]
    Client(String),

    #[error("could not read CA bundle {path}: {source}")]
    CaBundle {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("index '{0}' already exists")]
    IndexExists(String),

    #[error("HTTP {status}: {error_type}: {reason}")]
    Status {
        status: u16,
        error_type: String,
        reason: String,
    },

    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl EsError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::IndexExists(_) => Some(400),
            _ => None,
        }
    }
}

/// Receives embedded documents.
pub trait DocumentSink {
    /// Store `doc` in `index`, returning the engine-assigned id.
    fn index_document(&self, index: &str, doc: &Document) -> Result<String, EsError>;
}

/// Answers vector queries.
pub trait KnnBackend {
    fn knn_search(&self, index: &str, query: &KnnQuery) -> Result<Vec<SearchHit>, EsError>;
}

/// Blocking client for the few REST endpoints used here.
#[derive(Clone)]
pub struct EsClient {
    http: Client,
    config: EsConfig,
}

impl EsClient {
    pub fn new(config: EsConfig) -> Result<Self, EsError> {
        let mut builder = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(config.insecure);

        if let Some(path) = &config.ca_certs {
            let pem = std::fs::read(path).map_err(|source| EsError::CaBundle {
                path: path.display().to_string(),
                source,
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| EsError::Client(format!("invalid CA bundle: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder.build().map_err(|e| EsError::Client(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &EsConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url(), path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> (String, RequestBuilder) {
        let url = self.url(path);
        let mut req = self.http.request(method, &url);
        if let Some((user, password)) = self.config.credentials() {
            req = req.basic_auth(user, Some(password));
        }
        (url, req)
    }

    fn send(url: &str, req: RequestBuilder) -> Result<Response, EsError> {
        tracing::trace!(url = %url, "sending request");
        let response = req.send().map_err(|source| EsError::Transport {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(status_error(status, &body))
    }

    fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, EsError> {
        response.json::<T>().map_err(|e| EsError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// `GET /`
    pub fn info(&self) -> Result<ClusterInfo, EsError> {
        let (url, req) = self.request(Method::GET, "");
        let response = Self::send(&url, req)?;
        Self::decode(&url, response)
    }

    /// `PUT /{index}` with settings and mappings from `spec`.
    pub fn create_index(&self, index: &str, spec: &IndexSpec) -> Result<(), EsError> {
        let (url, req) = self.request(Method::PUT, index);
        match Self::send(&url, req.json(&spec.body())) {
            Ok(_) => Ok(()),
            Err(EsError::Status { error_type, .. })
                if error_type == "resource_already_exists_exception" =>
            {
                Err(EsError::IndexExists(index.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// `DELETE /{index}`. Returns `false` when the index did not exist.
    pub fn delete_index(&self, index: &str) -> Result<bool, EsError> {
        let (url, req) = self.request(Method::DELETE, index);
        match Self::send(&url, req) {
            Ok(_) => Ok(true),
            Err(EsError::Status { status: 404, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// `POST /{index}/_refresh` so freshly indexed documents are searchable.
    pub fn refresh(&self, index: &str) -> Result<(), EsError> {
        let (url, req) = self.request(Method::POST, &format!("{index}/_refresh"));
        Self::send(&url, req).map(|_| ())
    }
}

impl DocumentSink for EsClient {
    fn index_document(&self, index: &str, doc: &Document) -> Result<String, EsError> {
        let (url, req) = self.request(Method::POST, &format!("{index}/_doc"));
        let response = Self::send(&url, req.json(doc))?;
        let body: Value = Self::decode(&url, response)?;
        body.get("_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| EsError::Decode {
                url,
                message: "missing _id".into(),
            })
    }
}

impl KnnBackend for EsClient {
    fn knn_search(&self, index: &str, query: &KnnQuery) -> Result<Vec<SearchHit>, EsError> {
        let (url, req) = self.request(Method::POST, &format!("{index}/_search"));
        let response = Self::send(&url, req.json(&query.body()))?;
        let parsed: SearchResponse = Self::decode(&url, response)?;
        Ok(parsed.hits.hits.into_iter().map(SearchHit::from).collect())
    }
}

/// Build a [`EsError::Status`] from an error response, pulling the type and
/// reason out of the engine's `{"error": {...}}` envelope when present.
fn status_error(status: StatusCode, body: &str) -> EsError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));

    let (error_type, reason) = match error {
        Some(Value::Object(obj)) => (
            obj.get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            obj.get("reason")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        ),
        Some(Value::String(s)) => ("error".to_string(), s.clone()),
        _ => (
            status.canonical_reason().unwrap_or("error").to_string(),
            body.trim().chars().take(200).collect(),
        ),
    };

    EsError::Status {
        status: status.as_u16(),
        error_type,
        reason,
    }
}
