mod common;

use common::{StubResponse, StubServer};
use maltrieve::classifier::classify;
use maltrieve::config::{CritsConfig, ServicesConfig};
use maltrieve::submitters::crits::file_format;
use maltrieve::submitters::{
    build_submitters, submission_client, CritsSubmitter, CuckooSubmitter, ViperSubmitter,
    VxCageSubmitter,
};
use maltrieve::{MaltrieveError, Sample, Submitter, CLIENT_USER_AGENT};

fn sample() -> Sample {
    let bytes = b"MZ\x90\x00submitted".to_vec();
    let classification = classify(&bytes);
    Sample {
        source_url: "http://bad.example/drop/payload.exe".to_string(),
        bytes,
        mime_type: classification.mime_type,
        content_hash: classification.content_hash,
    }
}

fn body_text(server: &StubServer, path: &str) -> String {
    server
        .requests()
        .into_iter()
        .find(|r| r.path == path)
        .map(|r| String::from_utf8_lossy(&r.body).into_owned())
        .unwrap_or_default()
}

fn crits_config(url: String) -> CritsConfig {
    CritsConfig {
        url,
        username: "analyst".to_string(),
        api_key: "secret".to_string(),
        source: "maltrieve".to_string(),
        enabled: true,
        verify_tls: false,
    }
}

#[tokio::test]
async fn vxcage_uploads_file_with_tags() {
    common::init_tracing();
    let server = StubServer::start(vec![(
        "/malware/add",
        StubResponse::ok(r#"{"message": "added"}"#),
    )])
    .await;

    let submitter = VxCageSubmitter::new(submission_client(true).unwrap(), server.url(""));
    let receipt = submitter.submit(&sample()).await.unwrap();

    assert_eq!(receipt.service, "VxCage");
    assert_eq!(receipt.detail.as_deref(), Some("added"));

    let request = server.request("/malware/add").unwrap();
    assert_eq!(request.method, "POST");
    assert_eq!(request.header("user-agent"), Some(CLIENT_USER_AGENT));
    let body = body_text(&server, "/malware/add");
    assert!(body.contains("bad.example,Maltrieve"));
    assert!(body.contains(&sample().content_hash));
}

#[tokio::test]
async fn viper_uses_file_add() {
    common::init_tracing();
    let server = StubServer::start(vec![("/file/add", StubResponse::ok("{}"))]).await;

    let submitter = ViperSubmitter::new(submission_client(true).unwrap(), server.url("/"));
    let receipt = submitter.submit(&sample()).await.unwrap();

    assert_eq!(receipt.service, "Viper");
    assert_eq!(server.hits("/file/add"), 1);
}

#[tokio::test]
async fn cuckoo_sends_the_source_url() {
    common::init_tracing();
    let server = StubServer::start(vec![(
        "/tasks/create/url",
        StubResponse::ok(r#"{"task_id": 42}"#),
    )])
    .await;

    let submitter = CuckooSubmitter::new(submission_client(true).unwrap(), server.url(""));
    let receipt = submitter.submit(&sample()).await.unwrap();

    assert_eq!(receipt.detail.as_deref(), Some("task ID 42"));
    assert_eq!(
        server.request("/tasks/create/url").unwrap().header("user-agent"),
        Some(CLIENT_USER_AGENT)
    );
    assert_eq!(
        body_text(&server, "/tasks/create/url"),
        "url=http%3A%2F%2Fbad.example%2Fdrop%2Fpayload.exe"
    );
}

#[tokio::test]
async fn server_errors_are_rejections() {
    common::init_tracing();
    let server = StubServer::start(vec![("/tasks/create/url", StubResponse::status(500))]).await;

    let submitter = CuckooSubmitter::new(submission_client(true).unwrap(), server.url(""));
    let err = submitter.submit(&sample()).await.unwrap_err();

    assert!(matches!(err, MaltrieveError::Submission { ref service, .. } if service == "Cuckoo"));
}

#[tokio::test]
async fn unreachable_service_is_an_error() {
    common::init_tracing();
    let submitter = VxCageSubmitter::new(submission_client(true).unwrap(), "http://127.0.0.1:1");
    assert!(submitter.submit(&sample()).await.is_err());
}

#[tokio::test]
async fn crits_links_sample_to_domain() {
    common::init_tracing();
    let server = StubServer::start(vec![
        (
            "/api/v1/domains/",
            StubResponse::ok(r#"{"return_code": 0, "type": "Domain", "id": "d1", "message": "ok"}"#),
        ),
        (
            "/api/v1/samples/",
            StubResponse::ok(r#"{"return_code": 0, "type": "Sample", "id": "s1"}"#),
        ),
        ("/api/v1/relationships/", StubResponse::ok("{}")),
    ])
    .await;

    let submitter = CritsSubmitter::new(
        submission_client(false).unwrap(),
        crits_config(server.url("")),
    );
    let receipt = submitter.submit(&sample()).await.unwrap();

    assert_eq!(receipt.service, "CRITs");
    assert_eq!(receipt.detail.as_deref(), Some("Sample s1"));
    assert_eq!(
        server.paths(),
        vec!["/api/v1/domains/", "/api/v1/samples/", "/api/v1/relationships/"]
    );

    let domain = body_text(&server, "/api/v1/domains/");
    assert!(domain.contains("domain=bad.example"));
    assert!(domain.contains("api_key=secret"));

    for request in server.requests() {
        assert_eq!(request.header("user-agent"), Some(CLIENT_USER_AGENT));
    }

    let upload = body_text(&server, "/api/v1/samples/");
    assert!(upload.contains("name=\"filedata\""));
    assert!(upload.contains(&sample().content_hash));
    assert!(upload.contains("raw"));

    let relationship = body_text(&server, "/api/v1/relationships/");
    assert!(relationship.contains("rel_type=Downloaded_From"));
    assert!(relationship.contains("left_id=s1"));
    assert!(relationship.contains("right_id=d1"));
}

#[tokio::test]
async fn crits_skips_relationship_without_domain() {
    common::init_tracing();
    let server = StubServer::start(vec![
        ("/api/v1/domains/", StubResponse::ok(r#"{"return_code": 1}"#)),
        (
            "/api/v1/samples/",
            StubResponse::ok(r#"{"return_code": 0, "type": "Sample", "id": "s1"}"#),
        ),
    ])
    .await;

    let submitter = CritsSubmitter::new(
        submission_client(false).unwrap(),
        crits_config(server.url("")),
    );
    assert!(submitter.submit(&sample()).await.is_ok());
    assert_eq!(server.hits("/api/v1/relationships/"), 0);
}

#[tokio::test]
async fn crits_rejected_sample_is_an_error() {
    common::init_tracing();
    let server = StubServer::start(vec![
        (
            "/api/v1/domains/",
            StubResponse::ok(r#"{"return_code": 0, "type": "Domain", "id": "d1"}"#),
        ),
        ("/api/v1/samples/", StubResponse::ok(r#"{"return_code": 1, "message": "dup"}"#)),
    ])
    .await;

    let submitter = CritsSubmitter::new(
        submission_client(false).unwrap(),
        crits_config(server.url("")),
    );
    assert!(submitter.submit(&sample()).await.is_err());
    assert_eq!(server.hits("/api/v1/relationships/"), 0);
}

#[test]
fn crits_file_formats() {
    assert_eq!(file_format("application/zip"), "zip");
    assert_eq!(file_format("application/x-rar"), "rar");
    assert_eq!(file_format("application/x-dosexec"), "raw");
}

#[test]
fn submitters_follow_priority_order() {
    let services = ServicesConfig {
        vxcage: Some("http://localhost:8080".to_string()),
        cuckoo: Some("http://localhost:8090".to_string()),
        viper: Some("http://localhost:8081".to_string()),
        crits: Some(crits_config("https://crits.local".to_string())),
    };
    let names: Vec<String> = build_submitters(&services)
        .unwrap()
        .iter()
        .map(|s| s.name().to_string())
        .collect();
    assert_eq!(names, vec!["VxCage", "Cuckoo", "Viper", "CRITs"]);

    let none = build_submitters(&ServicesConfig::default()).unwrap();
    assert!(none.is_empty());
}
