//! Integration tests for the probe pipeline
//!
//! These tests use wiremock to stand up mock sites and run real HTTP probes
//! and full census passes against them.

use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wp_census::config::{Config, ProbeConfig, ProgressConfig, StorageConfig, UserAgentConfig};
use wp_census::probe::{
    classify, finalize_batch, Coordinator, FailureKind, HttpTransport, ProbeResult, RunOutcome,
    Transport, MAX_BODY_BYTES,
};
use wp_census::storage::{open_storage, Storage};
use wp_census::{DomainStatus, Verdict};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestCensus".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

/// Creates a test configuration probing over plain HTTP
fn create_test_config(db_path: &str) -> Config {
    Config {
        probe: ProbeConfig {
            request_timeout: 1,
            chunk_size: 2,
            concurrency: 4,
            max_redirects: 2,
            scheme: "http".to_string(),
            offset: 0,
            resume: false,
        },
        progress: ProgressConfig { report_every: 2 },
        user_agent: user_agent(),
        storage: StorageConfig {
            database_path: db_path.to_string(),
        },
    }
}

fn transport(max_redirects: u32) -> HttpTransport {
    HttpTransport::new(&user_agent(), Duration::from_secs(1), max_redirects)
        .expect("Failed to build transport")
}

/// Host and port of a mock server, as stored in a domain row
fn host_of(server: &MockServer) -> String {
    let url = url::Url::parse(&server.uri()).expect("Failed to parse server URI");
    format!(
        "{}:{}",
        url.host_str().expect("Failed to extract host"),
        url.port().expect("Failed to extract port")
    )
}

async fn site(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

async fn probe(server: &MockServer, max_redirects: u32) -> ProbeResult {
    let url = url::Url::parse(&format!("{}/", server.uri())).unwrap();
    transport(max_redirects).fetch(url).await
}

#[tokio::test]
async fn test_powered_by_header_is_positive() {
    let server = site(
        ResponseTemplate::new(200)
            .insert_header("X-Powered-By", "WordPress")
            .set_body_string("<html><body>Welcome</body></html>"),
    )
    .await;

    let result = probe(&server, 5).await;
    assert_eq!(classify(&result), Verdict::Positive);
}

#[tokio::test]
async fn test_user_agent_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(wiremock::matchers::header(
            "user-agent",
            "TestCensus/1.0.0 (+https://example.com/contact; test@example.com)",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let result = probe(&server, 5).await;
    assert_eq!(classify(&result), Verdict::Negative);
}

#[tokio::test]
async fn test_generator_meta_is_positive() {
    let server = site(ResponseTemplate::new(200).set_body_string(
        r#"<html><head><meta name="generator" content="WordPress 6.4.2" /></head><body></body></html>"#,
    ))
    .await;

    assert_eq!(classify(&probe(&server, 5).await), Verdict::Positive);
}

#[tokio::test]
async fn test_plain_page_is_negative() {
    let server = site(
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html")
            .set_body_string("<html><head><title>Shop</title></head><body>Hi</body></html>"),
    )
    .await;

    let result = probe(&server, 5).await;
    match &result {
        ProbeResult::Response(response) => {
            assert_eq!(response.status, 200);
            assert!(response
                .header_values("Content-Type")
                .any(|v| v.starts_with("text/html")));
        }
        other => panic!("expected a response, got {:?}", other),
    }
    assert_eq!(classify(&result), Verdict::Negative);
}

#[tokio::test]
async fn test_empty_body_is_no_reply() {
    let server = site(ResponseTemplate::new(200).insert_header("X-Pingback", "/xmlrpc.php")).await;
    assert_eq!(classify(&probe(&server, 5).await), Verdict::NoReply);
}

#[tokio::test]
async fn test_server_error_is_failure() {
    let server = site(ResponseTemplate::new(500).set_body_string("/wp-content/ broken")).await;

    let result = probe(&server, 5).await;
    assert!(matches!(
        result,
        ProbeResult::Failure {
            kind: FailureKind::HttpStatus(500),
            ..
        }
    ));
    assert_eq!(classify(&result), Verdict::NoReply);
}

#[tokio::test]
async fn test_slow_site_times_out() {
    let server = site(
        ResponseTemplate::new(200)
            .set_body_string("<html>late</html>")
            .set_delay(Duration::from_secs(3)),
    )
    .await;

    let result = probe(&server, 5).await;
    assert!(matches!(
        result,
        ProbeResult::Failure {
            kind: FailureKind::Timeout,
            ..
        }
    ));
}

#[tokio::test]
async fn test_redirects_followed_within_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/home/"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/home/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<script src="/wp-includes/js/jquery.js"></script>"#),
        )
        .mount(&server)
        .await;

    assert_eq!(classify(&probe(&server, 2).await), Verdict::Positive);
}

#[tokio::test]
async fn test_redirect_chain_over_limit_fails() {
    let server = MockServer::start().await;
    for (from, to) in [("/", "/r1"), ("/r1", "/r2"), ("/r2", "/r3"), ("/r3", "/r4")] {
        Mock::given(method("GET"))
            .and(path(from))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", to))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/r4"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>/wp-content/</html>"))
        .mount(&server)
        .await;

    let result = probe(&server, 2).await;
    assert!(matches!(
        result,
        ProbeResult::Failure {
            kind: FailureKind::RedirectLimit,
            ..
        }
    ));
}

#[tokio::test]
async fn test_large_body_is_truncated() {
    let mut body = String::from(r#"<html><head><meta name="generator" content="WordPress 6.5"></head><body>"#);
    body.push_str(&"x".repeat(3 * MAX_BODY_BYTES));
    body.push_str("</body></html>");
    let server = site(ResponseTemplate::new(200).set_body_string(body)).await;

    let result = probe(&server, 5).await;
    match &result {
        ProbeResult::Response(response) => assert_eq!(response.body.len(), MAX_BODY_BYTES),
        other => panic!("expected a response, got {:?}", other),
    }
    assert_eq!(classify(&result), Verdict::Positive);
}

#[tokio::test]
async fn test_signature_past_body_cap_is_not_seen() {
    let mut body = "a".repeat(MAX_BODY_BYTES + 1024);
    body.push_str("/wp-content/themes/late/style.css");
    let server = site(ResponseTemplate::new(200).set_body_string(body)).await;

    assert_eq!(classify(&probe(&server, 5).await), Verdict::Negative);
}

#[tokio::test]
async fn test_full_census_pass() {
    let wordpress = site(
        ResponseTemplate::new(200)
            .set_body_string(r#"<link rel='stylesheet' href='/wp-content/themes/twentytwentyfour/style.css'>"#),
    )
    .await;
    let plain = site(ResponseTemplate::new(200).set_body_string("<html><body>Hello</body></html>")).await;
    let broken = site(ResponseTemplate::new(503).set_body_string("maintenance")).await;
    let slow = site(
        ResponseTemplate::new(200)
            .set_body_string("<html>/wp-admin/</html>")
            .set_delay(Duration::from_secs(3)),
    )
    .await;
    let pingback = site(
        ResponseTemplate::new(200)
            .insert_header("X-Pingback", "https://blog.test/xmlrpc.php")
            .set_body_string("<html><body>blog</body></html>"),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("census.db");
    let config = create_test_config(db_path.to_str().unwrap());

    let batch = {
        let mut storage = open_storage(&db_path).unwrap();
        let batch = storage.create_batch("tranco").unwrap();
        let hosts: Vec<String> = [&wordpress, &plain, &broken, &slow, &pingback]
            .iter()
            .map(|s| host_of(s))
            .collect();
        storage.insert_domains(batch, &hosts).unwrap();
        batch
    };

    let storage = open_storage(&db_path).unwrap();
    let mut coordinator = Coordinator::from_config(&config, storage).unwrap();
    let outcome = coordinator.run().await.unwrap();

    let RunOutcome::Completed { batch: record, counters } = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(record.id, batch);
    assert!(record.is_resumable());
    assert_eq!(counters.processed, 5);
    assert_eq!(counters.positive, 2);
    assert_eq!(counters.negative, 1);
    assert_eq!(counters.no_reply, 2);
    assert_eq!(counters.chunks, 3);
    assert_eq!(counters.progress_reports, 2);

    let storage = coordinator.into_storage();
    let expected = [
        DomainStatus::Positive,
        DomainStatus::Negative,
        DomainStatus::NoReply,
        DomainStatus::NoReply,
        DomainStatus::Positive,
    ];
    for (index, status) in expected.iter().enumerate() {
        let domain = storage.get_domain(index as i64 + 1).unwrap();
        assert_eq!(domain.status, *status, "domain {}", domain.domain);
    }

    // Every domain is classified, so the batch can be closed
    let mut storage = storage;
    let finalized = finalize_batch(&mut storage, batch).unwrap();
    assert!(finalized.completed);

    // Nothing left to resume
    let storage = open_storage(&db_path).unwrap();
    let mut config = config;
    config.probe.resume = true;
    let mut coordinator = Coordinator::from_config(&config, storage).unwrap();
    assert!(matches!(
        coordinator.run().await.unwrap(),
        RunOutcome::NoEligibleBatch
    ));
}

#[tokio::test]
async fn test_interrupted_batch_resumes_without_reprobing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>plain</html>"))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("census.db");
    let config = create_test_config(db_path.to_str().unwrap());

    let batch = {
        let mut storage = open_storage(&db_path).unwrap();
        let batch = storage.create_batch("majestic").unwrap();
        let host = host_of(&server);
        storage
            .insert_domains(batch, &[host.clone(), host.clone(), host])
            .unwrap();
        // First domain was classified before the interruption
        storage.mark_batch_started(batch).unwrap();
        storage
            .update_domain_status(1, DomainStatus::Positive, chrono::Utc::now())
            .unwrap();
        batch
    };

    let storage = open_storage(&db_path).unwrap();
    let mut config = config;
    config.probe.resume = true;
    let mut coordinator = Coordinator::from_config(&config, storage).unwrap();
    let RunOutcome::Completed { counters, .. } = coordinator.run().await.unwrap() else {
        panic!("expected a completed run");
    };

    assert_eq!(counters.processed, 2);
    let storage = coordinator.into_storage();
    assert_eq!(storage.get_domain(1).unwrap().status, DomainStatus::Positive);
    assert_eq!(
        storage
            .count_domains_by_status(batch, DomainStatus::Negative)
            .unwrap(),
        2
    );
}
