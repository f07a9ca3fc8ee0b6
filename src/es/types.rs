use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Field holding the document embedding.
pub const EMBEDDING_FIELD: &str = "sentence_embedding";

/// Summary of `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClusterInfo {
    pub name: String,
    pub cluster_name: String,
    pub version: ClusterVersion,
    #[serde(default)]
    pub tagline: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClusterVersion {
    pub number: String,
}

impl std::fmt::Display for ClusterInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cluster {} (node {}, version {})",
            self.cluster_name, self.name, self.version.number
        )
    }
}

/// Vector similarity used by the `dense_vector` mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Similarity {
    #[default]
    Cosine,
    DotProduct,
    L2Norm,
}

impl Similarity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::DotProduct => "dot_product",
            Self::L2Norm => "l2_norm",
        }
    }
}

/// Settings and mappings for a new index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub shards: u32,
    pub replicas: u32,
    pub dims: usize,
    pub similarity: Similarity,
}

impl IndexSpec {
    pub fn new(dims: usize) -> Self {
        Self {
            shards: 2,
            replicas: 1,
            dims,
            similarity: Similarity::Cosine,
        }
    }

    /// Request body for `PUT /{index}`.
    pub fn body(&self) -> Value {
        let text_with_keyword = json!({
            "type": "text",
            "fields": { "keyword": { "type": "keyword" } }
        });

        json!({
            "settings": {
                "number_of_shards": self.shards,
                "number_of_replicas": self.replicas,
            },
            "mappings": {
                "properties": {
                    "sentence_embedding": {
                        "type": "dense_vector",
                        "dims": self.dims,
                        "index": true,
                        "similarity": self.similarity.as_str(),
                    },
                    "sentence_text": text_with_keyword.clone(),
                    "document_name": text_with_keyword,
                }
            }
        })
    }
}

/// One embedded text file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub sentence_text: String,
    pub document_name: String,
    pub sentence_embedding: Vec<f32>,
}

/// A kNN clause against [`EMBEDDING_FIELD`].
#[derive(Debug, Clone, PartialEq)]
pub struct KnnQuery {
    pub query_vector: Vec<f32>,
    pub k: usize,
    pub num_candidates: usize,
}

impl KnnQuery {
    pub fn new(query_vector: Vec<f32>, k: usize, num_candidates: usize) -> Self {
        let k = k.max(1);
        Self {
            query_vector,
            k,
            // The engine rejects num_candidates < k.
            num_candidates: num_candidates.max(k),
        }
    }

    /// Request body for `POST /{index}/_search`.
    pub fn body(&self) -> Value {
        json!({
            "knn": {
                "field": EMBEDDING_FIELD,
                "query_vector": self.query_vector,
                "k": self.k,
                "num_candidates": self.num_candidates,
            },
            "_source": ["sentence_text", "document_name"],
        })
    }
}

/// A ranked match.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub score: f64,
    pub sentence_text: String,
    pub document_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HitsEnvelope {
    #[serde(default)]
    pub hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawHit {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_score")]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: HitSource,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HitSource {
    #[serde(default)]
    pub sentence_text: String,
    #[serde(default)]
    pub document_name: String,
}

impl From<RawHit> for SearchHit {
    fn from(raw: RawHit) -> Self {
        Self {
            id: raw.id,
            score: raw.score.unwrap_or(0.0),
            sentence_text: raw.source.sentence_text,
            document_name: raw.source.document_name,
        }
    }
}
