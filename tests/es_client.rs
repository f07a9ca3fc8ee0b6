use es_semantic::config::EsConfig;
use es_semantic::es::{
    Document, DocumentSink, EsClient, EsError, IndexSpec, KnnBackend, KnnQuery,
};

mod util;
use util::{CLUSTER_INFO, StubServer, closed_url, search_response};

fn client_for(url: &str) -> EsClient {
    EsClient::new(EsConfig::for_url(url).unwrap()).unwrap()
}

#[test]
fn info_reads_cluster_summary() {
    let server = StubServer::start(|_| (200, CLUSTER_INFO.to_string()));
    let info = client_for(&server.url).info().unwrap();

    assert_eq!(info.cluster_name, "docker-cluster");
    assert_eq!(info.name, "node-1");
    assert_eq!(info.version.number, "8.13.4");

    let requests = server.requests();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/");
}

#[test]
fn basic_auth_is_sent_when_user_is_set() {
    let server = StubServer::start(|_| (200, CLUSTER_INFO.to_string()));
    let mut config = EsConfig::for_url(&server.url).unwrap();
    config.user = Some("elastic".into());
    config.password = Some("changeme".into());
    EsClient::new(config).unwrap().info().unwrap();

    let auth = server.requests()[0].headers.get("authorization").cloned();
    // base64("elastic:changeme")
    assert_eq!(auth.as_deref(), Some("Basic ZWxhc3RpYzpjaGFuZ2VtZQ=="));
}

#[test]
fn create_index_sends_mapping() {
    let server = StubServer::start(|_| (200, r#"{"acknowledged":true}"#.to_string()));
    client_for(&server.url)
        .create_index("es0", &IndexSpec::new(384))
        .unwrap();

    let request = &server.requests()[0];
    assert_eq!(request.method, "PUT");
    assert_eq!(request.path, "/es0");
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    let vector = &body["mappings"]["properties"]["sentence_embedding"];
    assert_eq!(vector["type"], "dense_vector");
    assert_eq!(vector["dims"], 384);
}

#[test]
fn existing_index_is_reported_as_such() {
    let server = StubServer::start(|_| {
        (
            400,
            r#"{"error":{"type":"resource_already_exists_exception","reason":"index [es0/x] already exists"},"status":400}"#
                .to_string(),
        )
    });
    let err = client_for(&server.url)
        .create_index("es0", &IndexSpec::new(8))
        .unwrap_err();
    assert!(matches!(err, EsError::IndexExists(ref name) if name == "es0"));
}

#[test]
fn delete_missing_index_returns_false() {
    let server = StubServer::start(|_| {
        (
            404,
            r#"{"error":{"type":"index_not_found_exception","reason":"no such index [es0]"},"status":404}"#
                .to_string(),
        )
    });
    assert!(!client_for(&server.url).delete_index("es0").unwrap());
}

#[test]
fn delete_existing_index_returns_true() {
    let server = StubServer::start(|_| (200, r#"{"acknowledged":true}"#.to_string()));
    assert!(client_for(&server.url).delete_index("es0").unwrap());

    let request = &server.requests()[0];
    assert_eq!(request.method, "DELETE");
    assert_eq!(request.path, "/es0");
}

#[test]
fn index_document_returns_id() {
    let server = StubServer::start(|_| (201, r#"{"_id":"abc123","result":"created"}"#.to_string()));
    let doc = Document {
        sentence_text: "hello".into(),
        document_name: "Document 0".into(),
        sentence_embedding: vec![0.5, 0.5],
    };
    let id = client_for(&server.url).index_document("es0", &doc).unwrap();
    assert_eq!(id, "abc123");

    let request = &server.requests()[0];
    assert_eq!(request.path, "/es0/_doc");
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["document_name"], "Document 0");
    assert_eq!(body["sentence_embedding"][1], 0.5);
}

#[test]
fn knn_search_parses_hits() {
    let server = StubServer::start(|_| (200, search_response(&[("first", 0.9), ("second", 0.4)])));
    let hits = client_for(&server.url)
        .knn_search("es0", &KnnQuery::new(vec![1.0, 0.0], 5, 2))
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].sentence_text, "first");
    assert_eq!(hits[0].document_name, "Document 0");
    assert!((hits[0].score - 0.9).abs() < 1e-9);

    let request = &server.requests()[0];
    assert_eq!(request.path, "/es0/_search");
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["knn"]["k"], 5);
    assert_eq!(body["knn"]["num_candidates"], 5);
}

#[test]
fn unreachable_cluster_is_a_transport_error() {
    let err = client_for(&closed_url()).info().unwrap_err();
    assert!(matches!(err, EsError::Transport { .. }));
    assert_eq!(err.status(), None);
}
