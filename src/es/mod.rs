//! Elasticsearch access.
//!
//! Everything interesting (storage, kNN ranking) happens inside the cluster;
//! this module only shapes requests and decodes responses for:
//!
//! - `GET /` cluster info
//! - `PUT /{index}` / `DELETE /{index}`
//! - `POST /{index}/_doc`
//! - `POST /{index}/_refresh`
//! - `POST /{index}/_search` with a `knn` clause

pub mod client;
pub mod types;

pub use client::{DocumentSink, EsClient, EsError, KnnBackend};
pub use types::{
    ClusterInfo, Document, EMBEDDING_FIELD, IndexSpec, KnnQuery, SearchHit, Similarity,
};
