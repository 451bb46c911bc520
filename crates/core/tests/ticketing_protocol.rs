//! HD Naumen REST client contract tests against a mock HTTP server.

use std::path::PathBuf;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fazreport_core::{
    config::{default_resolution_text, TicketingConfig},
    ticketing::{NaumenClient, TicketingError, TicketingSystem},
};

fn client(server: &MockServer) -> NaumenClient {
    NaumenClient::new(&TicketingConfig {
        base_url: server.uri(),
        access_key: "secret-key".to_string(),
        timeout_secs: 5,
        accept_invalid_certs: false,
        resolution_text: default_resolution_text(),
    })
    .expect("Failed to create client")
}

#[tokio::test]
async fn test_fetch_keys_and_description() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gateway/services/rest/getData"))
        .and(query_param("accessKey", "secret-key"))
        .and(query_param("params", "data$1,user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "fields": {
                "message": {
                    "header": {
                        "serviceCall": { "UUID": "sc1", "title": "RP-0042" }
                    }
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sd/services/rest/get/sc1"))
        .and(query_param("accessKey", "secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "UUID": "sc1",
            "sumDescription": "<p>Укажите ФИО: <b>Ann A</b></p>",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let keys = client(&server)
        .fetch_sum_description_and_keys("data$1")
        .await
        .unwrap();
    assert_eq!(keys.ticket_id, "sc1");
    assert_eq!(keys.sub_request_id, "RP-0042");
    assert_eq!(keys.sum_description, "<p>Укажите ФИО: <b>Ann A</b></p>");
}

#[tokio::test]
async fn test_fetch_without_ticket_uuid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gateway/services/rest/getData"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "fields": { "message": { "header": { "serviceCall": { "title": "RP-0042" } } } }
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_sum_description_and_keys("data$1")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TicketingError::EmptyField {
            operation: "getData",
            ..
        }
    ));
}

#[tokio::test]
async fn test_fetch_unknown_task() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_sum_description_and_keys("data$9")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TicketingError::Http {
            operation: "getData",
            status: 404,
            ..
        }
    ));
}

#[tokio::test]
async fn test_claim_accepts_200_and_202() {
    for status in [200, 202] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gateway/services/rest/takeSCResponsibility"))
            .and(query_param("params", "'sc1',user"))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).claim_ticket("sc1").await.unwrap();
    }
}

#[tokio::test]
async fn test_claim_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let err = client(&server).claim_ticket("sc1").await.unwrap_err();
    assert!(matches!(
        err,
        TicketingError::Http {
            operation: "takeSCResponsibility",
            status: 500,
            ..
        }
    ));
}

fn write_artifacts(dir: &TempDir) -> Vec<PathBuf> {
    ["Ann A..zip", "Bob B..zip"]
        .iter()
        .map(|name| {
            let path = dir.path().join(name);
            std::fs::write(&path, b"PK\x03\x04").unwrap();
            path
        })
        .collect()
}

#[tokio::test]
async fn test_attach_then_accept() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let artifacts = write_artifacts(&temp_dir);

    Mock::given(method("POST"))
        .and(path("/sd/services/rest/add-file/sc1"))
        .and(query_param("accessKey", "secret-key"))
        .respond_with(ResponseTemplate::new(201))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gateway/services/rest/setSCAcceptance"))
        .and(query_param(
            "params",
            format!("'sc1','{}',user", default_resolution_text()),
        ))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .attach_artifacts_and_accept("sc1", &default_resolution_text(), &artifacts)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_upload_failure_stops_before_accept() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let artifacts = write_artifacts(&temp_dir);

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(413).set_body_string("too large"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gateway/services/rest/setSCAcceptance"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server)
        .attach_artifacts_and_accept("sc1", "done", &artifacts)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TicketingError::Http {
            operation: "add-file",
            status: 413,
            ..
        }
    ));
}

#[tokio::test]
async fn test_missing_attachment() {
    let server = MockServer::start().await;
    let err = client(&server)
        .attach_artifacts_and_accept("sc1", "done", &[PathBuf::from("/nonexistent/report.zip")])
        .await
        .unwrap_err();
    assert!(matches!(err, TicketingError::Attachment { .. }));
}
