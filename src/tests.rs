//! Integration tests for the versions backend.

use std::sync::Arc;

use mockito::{Mock, Server, ServerGuard};
use reqwest::Client;
use serde_json::{json, Value};

use crate::aggregator::{JsonEndpointSource, LinkDefaults, VersionAggregator, VersionSource};
use crate::{create_router, AppState};

const CANONICAL_WEBSITE: &str = "https://site.example.net";
const CANONICAL_REPOSITORY: &str = "https://github.com/acme/site";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _upstream: ServerGuard,
}

impl TestFixture {
    /// Serve the app with one JSON endpoint source per path, all backed by
    /// the given mockito server.
    async fn with_sources(upstream: ServerGuard, paths: &[&str]) -> Self {
        let http = Client::new();
        let sources: Vec<Arc<dyn VersionSource>> = paths
            .iter()
            .map(|path| {
                Arc::new(JsonEndpointSource::new(
                    path.to_string(),
                    http.clone(),
                    format!("{}{}", upstream.url(), path),
                )) as Arc<dyn VersionSource>
            })
            .collect();

        let aggregator = Arc::new(VersionAggregator::new(
            sources,
            LinkDefaults {
                website: CANONICAL_WEBSITE.to_string(),
                repository: Some(CANONICAL_REPOSITORY.to_string()),
            },
        ));

        let app = create_router(AppState { aggregator });

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            _upstream: upstream,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn version_json(version: &str, date: &str, commit: &str) -> Value {
    json!({
        "version": version,
        "deploymentDate": date,
        "commitHash": commit,
        "changelog": [
            { "type": "feat", "description": "Deployment", "date": date }
        ],
        "deploymentPlatform": "Cloudflare Workers",
        "links": { "website": format!("https://{}.site.example.net", commit) }
    })
}

async fn mock_versions(server: &mut ServerGuard, path: &str, body: Value) -> Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await
}

#[tokio::test]
async fn test_health_check() {
    let upstream = Server::new_async().await;
    let fixture = TestFixture::with_sources(upstream, &[]).await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_list_versions_merges_sorts_and_dedups() {
    let mut upstream = Server::new_async().await;
    let _m1 = mock_versions(
        &mut upstream,
        "/workers",
        json!([
            version_json("1.0.0", "2024-01-01T00:00:00Z", "w1"),
            version_json("2.0.0", "2024-02-01T00:00:00Z", "shared-a"),
        ]),
    )
    .await;
    let _m2 = mock_versions(
        &mut upstream,
        "/pages",
        json!([
            version_json("2.0.0", "2024-02-01T00:00:00Z", "shared-b"),
            version_json("1.1.0", "2024-01-15T00:00:00Z", "p1"),
        ]),
    )
    .await;

    let fixture = TestFixture::with_sources(upstream, &["/workers", "/pages"]).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/versions"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    let records = body.as_array().unwrap();

    // Duplicate (2.0.0, 2024-02-01) collapsed, newest first
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["version"], "2.0.0");
    assert_eq!(records[1]["version"], "1.1.0");
    assert_eq!(records[2]["version"], "1.0.0");

    // First-seen wins: /workers is listed before /pages
    assert_eq!(records[0]["commitHash"], "shared-a");
}

#[tokio::test]
async fn test_list_versions_injects_canonical_links() {
    let mut upstream = Server::new_async().await;
    let _m = mock_versions(
        &mut upstream,
        "/workers",
        json!([
            {
                "version": "1.0.0",
                "deploymentDate": "2024-01-01T00:00:00Z",
                "commitHash": "bare",
                "deploymentPlatform": "Cloudflare Workers"
            }
        ]),
    )
    .await;

    let fixture = TestFixture::with_sources(upstream, &["/workers"]).await;

    let body: Value = fixture
        .client
        .get(fixture.url("/api/versions"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body[0]["links"]["website"], CANONICAL_WEBSITE);
    assert_eq!(body[0]["links"]["repository"], CANONICAL_REPOSITORY);
}

#[tokio::test]
async fn test_list_versions_with_version_filter() {
    let mut upstream = Server::new_async().await;
    let _m = mock_versions(
        &mut upstream,
        "/workers",
        json!([
            version_json("1.0.0", "2024-01-01T00:00:00Z", "w1"),
            version_json("1.1.0", "2024-01-15T00:00:00Z", "w2"),
        ]),
    )
    .await;

    let fixture = TestFixture::with_sources(upstream, &["/workers"]).await;

    let body: Value = fixture
        .client
        .get(fixture.url("/api/versions"))
        .query(&[("version", "1.0.0")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["version"], "1.0.0");
    assert_eq!(records[0]["commitHash"], "w1");
}

#[tokio::test]
async fn test_list_versions_with_platform_filter() {
    let mut upstream = Server::new_async().await;
    let _m = mock_versions(
        &mut upstream,
        "/workers",
        json!([
            version_json("1.0.0", "2024-01-01T00:00:00Z", "w1"),
            {
                "version": "0.9.0",
                "deploymentDate": "2023-12-01T00:00:00Z",
                "commitHash": "local",
                "deploymentPlatform": "Local Development"
            }
        ]),
    )
    .await;

    let fixture = TestFixture::with_sources(upstream, &["/workers"]).await;

    let body: Value = fixture
        .client
        .get(fixture.url("/api/versions"))
        .query(&[("platform", "Local Development")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["version"], "0.9.0");
}

#[tokio::test]
async fn test_unknown_platform_is_rejected() {
    let upstream = Server::new_async().await;
    let fixture = TestFixture::with_sources(upstream, &[]).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/versions"))
        .query(&[("platform", "Heroku")])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_fallback_when_all_sources_unavailable() {
    let mut upstream = Server::new_async().await;
    let _m1 = upstream
        .mock("GET", "/workers")
        .with_status(500)
        .create_async()
        .await;
    let _m2 = upstream
        .mock("GET", "/pages")
        .with_status(500)
        .create_async()
        .await;

    let fixture = TestFixture::with_sources(upstream, &["/workers", "/pages"]).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/versions"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["commitHash"], "fallback-version");
    assert_eq!(records[0]["deploymentPlatform"], "Local Development");
}

#[tokio::test]
async fn test_filter_matching_nothing_returns_placeholder() {
    let mut upstream = Server::new_async().await;
    let _m = mock_versions(
        &mut upstream,
        "/workers",
        json!([version_json("1.0.0", "2024-01-01T00:00:00Z", "w1")]),
    )
    .await;

    let fixture = TestFixture::with_sources(upstream, &["/workers"]).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/versions"))
        .query(&[("version", "9.9.9")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["version"], "9.9.9");
    assert_eq!(records[0]["commitHash"], "custom-version");
    assert_eq!(records[0]["links"]["website"], CANONICAL_WEBSITE);
}

#[tokio::test]
async fn test_get_version_found() {
    let mut upstream = Server::new_async().await;
    let _m = mock_versions(
        &mut upstream,
        "/workers",
        json!([
            version_json("1.0.0", "2024-01-01T00:00:00Z", "w1"),
            version_json("1.1.0", "2024-01-15T00:00:00Z", "w2"),
        ]),
    )
    .await;

    let fixture = TestFixture::with_sources(upstream, &["/workers"]).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/versions/1.1.0"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["version"], "1.1.0");
    assert_eq!(body["commitHash"], "w2");
}

#[tokio::test]
async fn test_get_version_not_found() {
    let mut upstream = Server::new_async().await;
    let _m = mock_versions(
        &mut upstream,
        "/workers",
        json!([version_json("1.0.0", "2024-01-01T00:00:00Z", "w1")]),
    )
    .await;

    let fixture = TestFixture::with_sources(upstream, &["/workers"]).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/versions/9.9.9"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}
