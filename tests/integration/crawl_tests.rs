//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! fetching, tree expansion and harvesting end-to-end.

use canvass::config::{ChildPathShape, Config};
use canvass::crawler::{run, FetchOutcome, Fetcher, RunOptions, TreeWalker, WorkerPool};
use canvass::crawler::{build_http_client, parse_node};
use canvass::{CanvassError, FetchError, Layout, NodeError};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server and a temp output
fn create_test_config(base_url: &str, output: &Path) -> Config {
    let mut config = Config::default();
    config.remote.base_url = base_url.to_string();
    config.crawler.request_delay_ms = 0;
    config.crawler.workers = 3;
    config.output.directory = output.to_string_lossy().into_owned();
    config
}

fn create_fetcher(base_url: &str) -> Fetcher {
    let config = Config::default();
    let client = build_http_client(&config.remote, &config.crawler).expect("client");
    Fetcher::new(client, base_url, Duration::ZERO)
}

/// Mounts a JSON document that must be requested exactly `times` times
async fn mount_json(server: &MockServer, route: &str, body: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "application/json"),
        )
        .expect(times)
        .mount(server)
        .await;
}

fn read(path: impl AsRef<Path>) -> String {
    std::fs::read_to_string(path.as_ref())
        .unwrap_or_else(|e| panic!("{} should exist: {}", path.as_ref().display(), e))
}

#[tokio::test]
async fn test_ensure_is_idempotent() {
    let server = MockServer::start().await;
    mount_json(&server, "/data/regions/root.json", r#"{"srs":{}}"#, 1).await;

    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("root.json");
    let fetcher = create_fetcher(&server.uri());

    let first = fetcher
        .ensure(&destination, "/data/regions/root.json")
        .await
        .unwrap();
    let second = fetcher
        .ensure(&destination, "/data/regions/root.json")
        .await
        .unwrap();

    assert_eq!(first, FetchOutcome::Downloaded { bytes: 10 });
    assert_eq!(second, FetchOutcome::AlreadyPresent);
    assert_eq!(read(&destination), r#"{"srs":{}}"#);
}

#[tokio::test]
async fn test_empty_body_leaves_no_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/results/1/empty.json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("empty.json");
    let fetcher = create_fetcher(&server.uri());

    let result = fetcher
        .ensure(&destination, "/data/results/1/empty.json")
        .await;

    // wiremock declares Content-Length: 0 for an empty body
    assert!(matches!(result, Err(FetchError::EmptyResponse { .. })));
    assert!(!destination.exists());
    assert!(!dir.path().join("empty.json.part").exists());
}

#[tokio::test]
async fn test_body_decoding_to_nothing_leaves_no_file() {
    let server = MockServer::start().await;

    // Non-empty on the wire, zero bytes once decompressed
    let compressed = GzEncoder::new(Vec::new(), Compression::default())
        .finish()
        .unwrap();
    assert!(!compressed.is_empty());

    Mock::given(method("GET"))
        .and(path("/data/results/1/blank.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-encoding", "gzip")
                .set_body_bytes(compressed),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("blank.json");
    let fetcher = create_fetcher(&server.uri());

    let result = fetcher
        .ensure(&destination, "/data/results/1/blank.json")
        .await;

    assert!(matches!(result, Err(FetchError::EmptyBody { .. })));
    assert!(!destination.exists());
    assert!(!dir.path().join("blank.json.part").exists());
}

#[tokio::test]
async fn test_error_status_leaves_no_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/contests/9.json"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("9.json");
    let fetcher = create_fetcher(&server.uri());

    let result = fetcher.ensure(&destination, "/data/contests/9.json").await;

    match result {
        Err(FetchError::Status { status, .. }) => assert!(status.contains("404")),
        other => panic!("expected status error, got {:?}", other),
    }
    assert!(!destination.exists());
}

#[tokio::test]
async fn test_gzip_body_is_stored_decompressed() {
    let server = MockServer::start().await;
    let body = r#"{"srs":{"01":{"can":"Region"}}}"#;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    Mock::given(method("GET"))
        .and(path("/data/regions/root.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-encoding", "gzip")
                .set_body_bytes(compressed),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("root.json");
    let fetcher = create_fetcher(&server.uri());

    fetcher
        .ensure(&destination, "/data/regions/root.json")
        .await
        .unwrap();

    assert_eq!(read(&destination), body);
}

#[tokio::test]
async fn test_corrupt_file_is_deleted_and_refetched() {
    let server = MockServer::start().await;
    mount_json(&server, "/data/regions/01.json", r#"{"srs":{}}"#, 1).await;

    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("01.json");
    std::fs::write(&destination, b"{\"srs\": {\"trunc").unwrap();

    let parsed = parse_node(&destination).await;
    assert!(matches!(parsed, Err(NodeError::Corrupt { .. })));
    assert!(!destination.exists());

    let fetcher = create_fetcher(&server.uri());
    let outcome = fetcher
        .ensure(&destination, "/data/regions/01.json")
        .await
        .unwrap();

    assert!(matches!(outcome, FetchOutcome::Downloaded { .. }));
    assert!(parse_node(&destination).await.unwrap().is_leaf());
}

#[tokio::test]
async fn test_full_crawl_two_regions() {
    let server = MockServer::start().await;

    mount_json(
        &server,
        "/data/regions/root.json",
        r#"{"srs":{"01":{"can":"Region"},"02":{"can":"Region"}}}"#,
        1,
    )
    .await;
    mount_json(
        &server,
        "/data/regions/01.json",
        r#"{"srs":{"0101":{"url":"01/0101","can":"Barangay"}}}"#,
        1,
    )
    .await;
    mount_json(&server, "/data/regions/02.json", r#"{"rn":"Empty region"}"#, 1).await;
    mount_json(
        &server,
        "/data/regions/01/0101.json",
        r#"{"pps":[{"vbs":[{"url":"0101/P1","cs":[5,6]}]}]}"#,
        1,
    )
    .await;
    mount_json(&server, "/data/results/0101/P1.json", r#"{"votes":1}"#, 1).await;
    mount_json(&server, "/data/contests/5.json", r#"{"id":5}"#, 1).await;
    mount_json(&server, "/data/contests/6.json", r#"{"id":6}"#, 1).await;

    let dir = TempDir::new().unwrap();
    let out = dir.path();
    let config = create_test_config(&server.uri(), out);

    let summary = run(config, RunOptions::default())
        .await
        .expect("Crawl failed");

    assert!(out.join("root.json").is_file());
    assert!(out.join("Region/01.json").is_file());
    assert!(out.join("Region/02.json").is_file());
    assert!(out.join("Barangay/0101.json").is_file());
    assert_eq!(read(out.join("Precinct/0101/P1.json")), r#"{"votes":1}"#);
    assert_eq!(read(out.join("Contest/5.json")), r#"{"id":5}"#);
    assert!(out.join("Contest/6.json").is_file());

    let (walk, _) = summary.structure.as_ref().unwrap();
    assert_eq!(walk.children_scheduled, 3);
    assert_eq!(walk.nodes_expanded, 4);
    assert!(walk.tiers.contains("Region"));
    assert!(walk.tiers.contains("Barangay"));

    let (harvest, _) = summary.harvest.as_ref().unwrap();
    assert_eq!(harvest.result_jobs, 1);
    assert_eq!(harvest.contest_jobs, 2);

    // root + 3 structural + 1 result + 2 contests
    assert_eq!(summary.downloaded(), 7);
    assert_eq!(summary.failed(), 0);
}

#[tokio::test]
async fn test_siblings_sharing_a_destination_are_fetched_once() {
    let server = MockServer::start().await;

    // Both children end in code "01" and would land on Region/01.json
    mount_json(
        &server,
        "/data/regions/root.json",
        r#"{"srs":{"a":{"url":"A/01","can":"Region"},"b":{"url":"B/01","can":"Region"}}}"#,
        1,
    )
    .await;
    mount_json(&server, "/data/regions/A/01.json", r#"{"rn":"First"}"#, 1).await;
    mount_json(&server, "/data/regions/B/01.json", r#"{"rn":"Second"}"#, 0).await;

    let dir = TempDir::new().unwrap();
    let out = dir.path();
    let mut config = create_test_config(&server.uri(), out);
    config.crawler.workers = 2;

    let options = RunOptions {
        skip_leaves: true,
        ..Default::default()
    };
    let summary = run(config, options).await.expect("Crawl failed");

    assert_eq!(read(out.join("Region/01.json")), r#"{"rn":"First"}"#);

    let (walk, fetched) = summary.structure.as_ref().unwrap();
    assert_eq!(walk.children_scheduled, 1);
    assert_eq!(walk.children_skipped, 1);
    // root + the first sibling
    assert_eq!(walk.nodes_expanded, 2);
    assert_eq!(fetched.downloaded, 2);
    assert_eq!(fetched.failed, 0);
}

#[tokio::test]
async fn test_rerun_fetches_nothing() {
    let server = MockServer::start().await;

    mount_json(
        &server,
        "/data/regions/root.json",
        r#"{"srs":{"01":{"can":"Barangay"}}}"#,
        1,
    )
    .await;
    mount_json(
        &server,
        "/data/regions/01.json",
        r#"{"pps":[{"vbs":[{"url":"01/P1","cs":[3]}]}]}"#,
        1,
    )
    .await;
    mount_json(&server, "/data/results/01/P1.json", r#"{"r":1}"#, 1).await;
    mount_json(&server, "/data/contests/3.json", r#"{"c":3}"#, 1).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    let first = run(config.clone(), RunOptions::default()).await.unwrap();
    let second = run(config, RunOptions::default()).await.unwrap();

    assert_eq!(first.downloaded(), 4);
    assert_eq!(second.downloaded(), 0);
    assert_eq!(second.already_present(), 4);
}

#[tokio::test]
async fn test_harvest_deduplicates_contests() {
    let server = MockServer::start().await;

    mount_json(&server, "/data/results/0101/P1.json", r#"{"r":1}"#, 1).await;
    mount_json(&server, "/data/results/0101/P2.json", r#"{"r":2}"#, 1).await;
    mount_json(&server, "/data/contests/5.json", r#"{"c":5}"#, 1).await;

    let dir = TempDir::new().unwrap();
    let out = dir.path();
    std::fs::create_dir_all(out.join("Barangay")).unwrap();
    std::fs::write(
        out.join("Barangay/0101.json"),
        r#"{"pps":[
            {"vbs":[{"url":"0101/P1","cs":[5]}]},
            {"vbs":[{"url":"0101/P2","cs":[5]}]}
        ]}"#,
    )
    .unwrap();
    // Unparsable leaf documents are skipped and kept
    std::fs::write(out.join("Barangay/broken.json"), b"{not json").unwrap();

    let config = create_test_config(&server.uri(), out);
    let options = RunOptions {
        skip_structure: true,
        skip_leaves: false,
    };

    let summary = run(config, options).await.unwrap();

    let (harvest, pool) = summary.harvest.as_ref().unwrap();
    assert_eq!(harvest.result_jobs, 2);
    assert_eq!(harvest.contest_jobs, 1);
    assert_eq!(harvest.duplicate_contests, 1);
    assert_eq!(harvest.files_skipped, 1);
    assert_eq!(pool.downloaded, 3);

    assert!(out.join("Precinct/0101/P1.json").is_file());
    assert!(out.join("Precinct/0101/P2.json").is_file());
    assert!(out.join("Contest/5.json").is_file());
    assert!(out.join("Barangay/broken.json").is_file());
}

#[tokio::test]
async fn test_failed_child_does_not_stop_siblings() {
    let server = MockServer::start().await;

    mount_json(
        &server,
        "/data/regions/root.json",
        r#"{"srs":{"01":{"can":"Region"},"02":{"can":"Region"}}}"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/data/regions/01.json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    mount_json(
        &server,
        "/data/regions/02.json",
        r#"{"srs":{"0201":{"url":"02/0201","can":"Province"}}}"#,
        1,
    )
    .await;
    mount_json(&server, "/data/regions/02/0201.json", r#"{}"#, 1).await;

    let dir = TempDir::new().unwrap();
    let out = dir.path();
    let config = create_test_config(&server.uri(), out);
    let options = RunOptions {
        skip_structure: false,
        skip_leaves: true,
    };

    let summary = run(config, options).await.unwrap();

    assert!(!out.join("Region/01.json").exists());
    assert!(out.join("Province/0201.json").is_file());

    let (walk, pool) = summary.structure.as_ref().unwrap();
    assert_eq!(walk.children_skipped, 1);
    assert_eq!(pool.failed, 1);
}

#[tokio::test]
async fn test_root_fetch_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/regions/root.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    let result = run(config, RunOptions::default()).await;

    assert!(matches!(result, Err(CanvassError::Fetch(_))));
}

#[tokio::test]
async fn test_missing_leaf_tier_is_fatal() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let options = RunOptions {
        skip_structure: true,
        skip_leaves: false,
    };

    let result = run(config, options).await;

    assert!(matches!(result, Err(CanvassError::Setup { .. })));
}

#[tokio::test]
async fn test_code_prefix_paths_and_partitioning() {
    let server = MockServer::start().await;

    mount_json(&server, "/data/regions/01/0101.json", r#"{"x":1}"#, 1).await;
    mount_json(&server, "/data/regions/01/0102.json", r#"{"x":2}"#, 1).await;

    let dir = TempDir::new().unwrap();
    let out = dir.path();
    std::fs::write(
        out.join("root.json"),
        r#"{"srs":{
            "a":{"url":"whatever/0101","can":"City"},
            "b":{"url":"whatever/0102","can":"Municipality"}
        }}"#,
    )
    .unwrap();

    let mut config = create_test_config(&server.uri(), out);
    config.remote.child_paths = ChildPathShape::CodePrefix;
    let layout = Layout::from_config(&config);

    let client = build_http_client(&config.remote, &config.crawler).unwrap();
    let fetcher = Arc::new(Fetcher::new(client, server.uri(), Duration::ZERO));
    let pool = WorkerPool::start(fetcher, 2, 1);

    let report = TreeWalker::new(&layout, &pool)
        .expand(&layout.root_document())
        .await
        .unwrap();
    let fetched = pool.shutdown().await;

    // Both children land under the first child's label
    assert!(out.join("City/0101.json").is_file());
    assert!(out.join("City/0102.json").is_file());
    assert!(!out.join("Municipality").exists());
    assert_eq!(report.nodes_expanded, 3);
    assert_eq!(fetched.downloaded, 2);
}
