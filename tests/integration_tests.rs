//! Integration tests for trackhub
//!
//! Track fixtures are written to a temp dir with real magic bytes.

use axum::Router;
use axum::http::StatusCode;
use axum_test::TestServer;
use noodles::csi::binning_index::index::{Header, ReferenceSequence, header::ReferenceSequenceNames};
use noodles::tabix;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Barrier;
use trackhub::{
    TrackRegistry,
    backend::BackendRegistry,
    formats::MagicOracle,
    storage::{LocalStorage, LocationStorage},
};

const BIGWIG_HEAD: [u8; 10] = [0x26, 0xFC, 0x8F, 0x88, 0x04, 0x00, 0x01, 0x00, 0xAA, 0xBB];

fn create_registry(data_dir: Option<&Path>) -> Arc<TrackRegistry> {
    let storage: Arc<dyn LocationStorage> =
        Arc::new(LocalStorage::new(data_dir.map(Path::to_path_buf)));
    Arc::new(TrackRegistry::new(
        "tracks",
        Arc::new(MagicOracle::new(storage.clone())),
        Arc::new(BackendRegistry::with_defaults(storage, 1024 * 1024)),
    ))
}

fn write_tabix_index(path: &Path, names: &[&str]) {
    let names: ReferenceSequenceNames = names.iter().map(|name| name.to_string()).collect();
    let reference_sequences = (0..names.len())
        .map(|_| ReferenceSequence::new(Default::default(), Vec::new(), None))
        .collect();
    let header = Header::builder()
        .set_reference_sequence_names(names)
        .build();
    let index = tabix::Index::builder()
        .set_header(header)
        .set_reference_sequences(reference_sequences)
        .build();
    tabix::write(path, &index).unwrap();
}

async fn create_test_server(registry: &Arc<TrackRegistry>) -> TestServer {
    let app = registry.clone().serve_to(Router::new()).await;
    TestServer::new(app).unwrap()
}

fn assert_cors(response: &axum_test::TestResponse) {
    assert_eq!(response.header("access-control-allow-origin"), "*");
}

#[tokio::test]
async fn test_redirect_to_format_namespace() {
    let registry = create_registry(None);
    registry.add_uri("a.bigwig", "wig1").await.unwrap();
    assert_eq!(registry.get("wig1").await.as_deref(), Some("a.bigwig"));

    let server = create_test_server(&registry).await;
    let response = server.get("/tracks/wig1/zoom").await;

    response.assert_status(StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.header("location"), "/tracks.bigwig/wig1/zoom");
    assert_cors(&response);
}

#[tokio::test]
async fn test_redirect_keeps_nested_command_and_query() {
    let registry = create_registry(None);
    registry.add_uri("b.hic", "m1").await.unwrap();

    let server = create_test_server(&registry).await;
    let response = server.get("/tracks/m1/get/chr1/0/1000?norm=KR").await;

    response.assert_status(StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.header("location"),
        "/tracks.hic/m1/get/chr1/0/1000?norm=KR"
    );
}

#[tokio::test]
async fn test_redirect_reencodes_reserved_characters() {
    let registry = create_registry(None);
    for key in ["a?b", "x/y", "my track"] {
        registry.add_uri("a.bigwig", key).await.unwrap();
    }

    let server = create_test_server(&registry).await;
    for (path, location, key) in [
        ("/tracks/a%3Fb/info", "/tracks.bigwig/a%3Fb/info", "a?b"),
        ("/tracks/x%2Fy/info", "/tracks.bigwig/x%2Fy/info", "x/y"),
        ("/tracks/my%20track/info", "/tracks.bigwig/my%20track/info", "my track"),
    ] {
        let response = server.get(path).await;
        response.assert_status(StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.header("location"), location);

        let info = server.get(location).await;
        info.assert_status_ok();
        let body: Value = info.json();
        assert_eq!(body["id"], key);
    }
}

#[tokio::test]
async fn test_redirect_unknown_id_is_not_found() {
    let registry = create_registry(None);
    registry.add_uri("a.bigwig", "wig1").await.unwrap();

    let server = create_test_server(&registry).await;
    let response = server.get("/tracks/missing/zoom").await;

    response.assert_status_not_found();
    assert_cors(&response);
    let body: Value = response.json();
    assert_eq!(body["error"]["kind"], "NotFound");
}

#[tokio::test]
async fn test_list_reports_formats() {
    let registry = create_registry(None);
    registry.add_uri("b.hic", "m1").await.unwrap();
    registry.add_uri("c.bigbed", "p1").await.unwrap();

    let server = create_test_server(&registry).await;
    let response = server.get("/tracks/list").await;
    response.assert_status_ok();
    assert_cors(&response);

    let body: Value = response.json();
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.contains(&serde_json::json!({"id": "m1", "format": "hic"})));
    assert!(entries.contains(&serde_json::json!({"id": "p1", "format": "bigbed"})));
}

#[tokio::test]
async fn test_ls_maps_keys_to_locations() {
    let registry = create_registry(None);
    registry.add_uri("a.bigwig", "wig1").await.unwrap();
    registry.add_uri("https://example.com/m.hic", "m1").await.unwrap();

    let server = create_test_server(&registry).await;
    let response = server.get("/tracks/ls").await;
    response.assert_status_ok();
    assert_cors(&response);

    let body: Value = response.json();
    assert_eq!(
        body,
        serde_json::json!({"wig1": "a.bigwig", "m1": "https://example.com/m.hic"})
    );
}

#[tokio::test]
async fn test_backend_serves_info_and_ranges() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("signal"), BIGWIG_HEAD).unwrap();

    let registry = create_registry(Some(dir.path()));
    // No extension: classified by sniffing the file's magic.
    registry.add_uri("signal", "wig1").await.unwrap();

    let server = create_test_server(&registry).await;

    let info = server.get("/tracks.bigwig/wig1/info").await;
    info.assert_status_ok();
    let body: Value = info.json();
    assert_eq!(body["format"], "bigwig");
    assert_eq!(body["location"], "signal");
    assert_eq!(body["size"], 10);
    assert_eq!(body["buffered"], false);

    let bytes = server.get("/tracks.bigwig/wig1/bytes?start=0&end=4").await;
    bytes.assert_status(StatusCode::PARTIAL_CONTENT);
    assert_eq!(bytes.header("content-range"), "bytes 0-3/10");
    assert_eq!(bytes.header("content-type"), "application/x-bigwig");
    assert_eq!(bytes.as_bytes().to_vec(), BIGWIG_HEAD[..4].to_vec());

    let whole = server.get("/tracks.bigwig/wig1/bytes").await;
    whole.assert_status_ok();
    assert_eq!(whole.as_bytes().len(), 10);

    server
        .get("/tracks.bigwig/wig1/unknown")
        .await
        .assert_status_not_found();
    server
        .get("/tracks.bigwig/other/info")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_backend_constructed_after_routing_is_reachable() {
    let registry = create_registry(None);
    let server = create_test_server(&registry).await;

    server.get("/tracks.hic/ls").await.assert_status_not_found();

    registry
        .add_uri("https://example.com/late.hic", "late")
        .await
        .unwrap();

    let redirect = server.get("/tracks/late/info").await;
    redirect.assert_status(StatusCode::TEMPORARY_REDIRECT);

    let response = server.get("/tracks.hic/ls").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["late"], "https://example.com/late.hic");
}

#[tokio::test]
async fn test_image_info_lists_tabix_references() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("cells.image.gz"),
        [0x1f, 0x8b, 0x08, 0x04, 0x00, 0x00, 0x00, 0x00],
    )
    .unwrap();
    write_tabix_index(&dir.path().join("cells.image.gz.tbi"), &["chr1", "chr2"]);

    let registry = create_registry(Some(dir.path()));
    registry.add_uri("cells.image.gz", "img").await.unwrap();
    registry.add_uri("https://example.com/w.bw", "wig").await.unwrap();

    let server = create_test_server(&registry).await;
    let response = server.get("/tracks.image/img/info").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["format"], "image");
    assert_eq!(body["references"], serde_json::json!(["chr1", "chr2"]));

    // Non-image tracks carry no reference list.
    let body: Value = server.get("/tracks.bigwig/wig/info").await.json();
    assert!(body.get("references").map_or(true, Value::is_null));
}

#[tokio::test]
async fn test_deferred_backend_serves_repeat_requests() {
    let registry = create_registry(None);
    let server = create_test_server(&registry).await;

    registry.add_uri("https://example.com/a.hic", "a").await.unwrap();
    let first: Value = server.get("/tracks.hic/ls").await.json();
    assert_eq!(first, serde_json::json!({"a": "https://example.com/a.hic"}));

    registry.add_uri("https://example.com/b.hic", "b").await.unwrap();
    let second = server.get("/tracks.hic/list").await;
    second.assert_status_ok();
    let mut keys: Vec<String> = second.json();
    keys.sort();
    assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

    server.get("/tracks.hic/b/info").await.assert_status_ok();
}

#[tokio::test]
async fn test_uploaded_stream_served_from_memory() {
    let registry = create_registry(None);
    let mut stream = std::io::Cursor::new(BIGWIG_HEAD.to_vec());
    registry
        .add("up", &mut stream, "upload://up.bw")
        .await
        .unwrap();

    let server = create_test_server(&registry).await;
    let response = server.get("/tracks.bigwig/up/bytes?start=8").await;
    response.assert_status(StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.header("content-range"), "bytes 8-9/10");
    assert_eq!(response.as_bytes().to_vec(), vec![0xAAu8, 0xBB]);
}

#[tokio::test]
async fn test_unsupported_location_leaves_list_unchanged() {
    let registry = create_registry(None);
    registry.add_uri("a.bigwig", "wig1").await.unwrap();

    for location in ["_format_:binindex:x", "/no/such/file.txt", "reads.bam"] {
        assert!(registry.add_uri(location, "bad").await.is_err());
    }
    assert_eq!(registry.list().await, vec!["wig1".to_string()]);
    assert!(registry.get("bad").await.is_none());
}

#[tokio::test]
async fn test_del_then_get_misses() {
    let registry = create_registry(None);
    for (key, location) in [("w", "a.bw"), ("b", "b.bb"), ("h", "c.hic")] {
        registry.add_uri(location, key).await.unwrap();
        registry.del(key).await.unwrap();
        assert!(registry.get(key).await.is_none());
        assert!(!registry.list().await.contains(&key.to_string()));
    }

    let server = create_test_server(&registry).await;
    server.get("/tracks/w/zoom").await.assert_status_not_found();
}

#[tokio::test]
async fn test_move_then_redirect_uses_new_key() {
    let registry = create_registry(None);
    registry.add_uri("a.bigwig", "wig1").await.unwrap();
    let before = registry.get("wig1").await;

    assert!(registry.move_track("wig1", "wig2").await);
    assert_eq!(registry.get("wig2").await, before);
    assert_eq!(registry.list().await, vec!["wig2".to_string()]);
    assert!(!registry.move_track("wig1", "wig3").await);

    let server = create_test_server(&registry).await;
    let response = server.get("/tracks/wig2/zoom").await;
    assert_eq!(response.header("location"), "/tracks.bigwig/wig2/zoom");
    server.get("/tracks/wig1/zoom").await.assert_status_not_found();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_loses_nothing() {
    const N: usize = 64;
    let extensions = ["bigwig", "bigbed", "bigbedLarge", "hic", "image.gz"];
    let registry = create_registry(None);
    let barrier = Arc::new(Barrier::new(N));

    let handles: Vec<_> = (0..N)
        .map(|i| {
            let registry = registry.clone();
            let barrier = barrier.clone();
            let location = format!("track{}.{}", i, extensions[i % extensions.len()]);
            tokio::spawn(async move {
                barrier.wait().await;
                registry.add_uri(&location, &format!("k{}", i)).await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let keys = registry.list().await;
    assert_eq!(keys.len(), N);
    let unique: HashSet<_> = keys.into_iter().collect();
    assert_eq!(unique.len(), N);
    assert_eq!(registry.entries().await.len(), N);
}
