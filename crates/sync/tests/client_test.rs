// HTTP contract tests for the workflow backend client

use ballotflow_core::{WorkflowStatus, WorkflowStep};
use ballotflow_sync::{StateSynchronizer, SyncConfig, SyncError, WorkflowApiClient};
use futures::StreamExt;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse_body(messages: &[serde_json::Value]) -> String {
    let mut body = String::from(":connected\n\n");
    for message in messages {
        body.push_str(&format!("data: {}\n\n", message));
    }
    body
}

#[tokio::test]
async fn test_fetch_states_decodes_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workflow/state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "step": "PRE_CONFIGURE",
                "status": "COMPLETE",
                "startTimestamp": "2024-03-01T09:00:00Z",
                "endTimestamp": "2024-03-01T09:02:00Z",
                "optional": false
            },
            {
                "step": "MIX_BALLOT_BOX",
                "contextId": "box-1",
                "status": "ERROR",
                "exceptionCode": "BallotBoxNotClosed",
                "optional": false
            }
        ])))
        .mount(&server)
        .await;

    let client = WorkflowApiClient::new(&format!("{}/", server.uri()));
    let states = client.fetch_states().await.unwrap();

    assert_eq!(states.len(), 2);
    assert_eq!(states[0].step, WorkflowStep::PRE_CONFIGURE);
    assert_eq!(states[0].status, WorkflowStatus::Complete);
    assert_eq!(states[1].context_id.as_deref(), Some("box-1"));
    assert_eq!(states[1].exception_code.as_deref(), Some("BallotBoxNotClosed"));
}

#[tokio::test]
async fn test_fetch_states_reports_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workflow/state"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let client = WorkflowApiClient::new(&server.uri());
    let error = client.fetch_states().await.unwrap_err();

    match error {
        SyncError::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_subscribe_parses_server_sent_events() {
    let server = MockServer::start().await;
    let body = sse_body(&[
        json!({"step": "COMPUTE", "status": "IN_PROGRESS", "optional": false}),
        json!({"step": "COMPUTE", "status": "COMPLETE", "optional": false, "sequence": 3}),
    ]);
    Mock::given(method("GET"))
        .and(path("/workflow/subscribe"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = WorkflowApiClient::new(&server.uri());
    let states: Vec<_> = client.subscribe().await.unwrap().collect().await;

    assert_eq!(states.len(), 2);
    let last = states[1].as_ref().unwrap();
    assert_eq!(last.status, WorkflowStatus::Complete);
    assert_eq!(last.sequence, Some(3));
}

#[tokio::test]
async fn test_subscribe_surfaces_malformed_messages_as_decode_errors() {
    let server = MockServer::start().await;
    let body = "data: {not json}\n\ndata: {\"step\":\"COMPUTE\",\"status\":\"READY\"}\n\n";
    Mock::given(method("GET"))
        .and(path("/workflow/subscribe"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = WorkflowApiClient::new(&server.uri());
    let items: Vec<_> = client.subscribe().await.unwrap().collect().await;

    assert_eq!(items.len(), 2);
    assert!(matches!(&items[0], Err(e) if e.is_decode()));
    assert_eq!(items[1].as_ref().unwrap().status, WorkflowStatus::Ready);
}

#[tokio::test]
async fn test_subscribe_rejects_missing_endpoint() {
    let server = MockServer::start().await;

    let client = WorkflowApiClient::new(&server.uri());
    let error = client.subscribe().await.err().unwrap();

    assert!(matches!(error, SyncError::Api { status: 404, .. }));
}

#[tokio::test]
async fn test_synchronizer_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workflow/state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"step": "PRE_CONFIGURE", "status": "COMPLETE", "optional": false},
            {"step": "COMPUTE", "status": "READY", "optional": false}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/workflow/subscribe"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse_body(&[json!({"step": "COMPUTE", "status": "IN_PROGRESS", "optional": false})]),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let config = SyncConfig::default().with_api_url(server.uri());
    let sync = StateSynchronizer::connect(&config);
    let mut pre_configure = sync.get(&WorkflowStep::PRE_CONFIGURE, None);

    let state = tokio::time::timeout(Duration::from_secs(5), pre_configure.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.status, WorkflowStatus::Complete);

    sync.shutdown();
}
