//! WahaClient Tests
//!
//! Tests for:
//! - Request shape (path, headers, JSON body)
//! - Status code classification
//! - Timeouts and connection errors
//! - End-to-end delivery through the dispatcher

use std::sync::Arc;
use std::time::Duration;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, header, body_json};

use relay_dispatch::{
    DeliveryClient, DeliveryError, Dispatcher, DispatcherConfig, Job, WahaClient, WahaClientConfig,
};

fn client_for(server: &MockServer) -> WahaClient {
    WahaClient::new(WahaClientConfig {
        base_url: server.uri(),
        api_key: "test-key".to_string(),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_send_text_request_shape() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/sendText"))
        .and(header("X-Api-Key", "test-key"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(serde_json::json!({
            "chatId": "628123456@c.us",
            "text": "hello there",
            "session": "main"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let job = Job::new("628123456", "hello there");

    client.send(&job, "main").await.unwrap();
}

#[tokio::test]
async fn test_200_is_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/sendText"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "x"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    assert!(client.send(&Job::new("1", "a"), "s").await.is_ok());
}

#[tokio::test]
async fn test_group_chat_id_passes_through() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(serde_json::json!({
            "chatId": "120363@g.us",
            "text": "team update",
            "session": "s1"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    client.send(&Job::new("120363@g.us", "team update"), "s1").await.unwrap();
}

#[tokio::test]
async fn test_non_success_status_is_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/sendText"))
        .respond_with(ResponseTemplate::new(422))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client.send(&Job::new("1", "a"), "s").await.unwrap_err();
    assert!(matches!(err, DeliveryError::Status(422)));
}

#[tokio::test]
async fn test_server_error_is_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client.send(&Job::new("1", "a"), "s").await.unwrap_err();
    assert!(matches!(err, DeliveryError::Status(500)));
}

#[tokio::test]
async fn test_timeout_is_http_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let client = WahaClient::new(WahaClientConfig {
        base_url: mock_server.uri(),
        timeout: Duration::from_millis(200),
        ..Default::default()
    })
    .unwrap();

    let err = client.send(&Job::new("1", "a"), "s").await.unwrap_err();
    match err {
        DeliveryError::Http(e) => assert!(e.is_timeout()),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_refused_is_http_error() {
    let client = WahaClient::new(WahaClientConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        ..Default::default()
    })
    .unwrap();

    let err = client.send(&Job::new("1", "a"), "s").await.unwrap_err();
    assert!(matches!(err, DeliveryError::Http(_)));
}

#[tokio::test]
async fn test_end_to_end_rotates_sessions() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/sendText"))
        .respond_with(ResponseTemplate::new(201))
        .expect(6)
        .mount(&mock_server)
        .await;

    let dispatcher = Dispatcher::new(
        DispatcherConfig {
            workers: 1,
            queue_capacity: 10,
            sessions: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            shutdown_timeout: Some(Duration::from_secs(10)),
        },
        Arc::new(client_for(&mock_server)),
    )
    .unwrap();

    for i in 0..6 {
        dispatcher.enqueue(Job::new(format!("62811{}", i), "hi")).unwrap();
    }
    dispatcher.start().unwrap();
    let report = dispatcher.stop().await.unwrap();
    assert!(report.drained);

    let requests = mock_server.received_requests().await.unwrap();
    let sessions: Vec<String> = requests
        .iter()
        .map(|r| {
            let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
            body["session"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(sessions, vec!["A", "B", "C", "A", "B", "C"]);
    assert_eq!(dispatcher.stats().delivered, 6);
}

#[tokio::test]
async fn test_end_to_end_gateway_down_drops_jobs() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&mock_server)
        .await;

    let dispatcher = Dispatcher::new(
        DispatcherConfig {
            workers: 2,
            queue_capacity: 10,
            sessions: vec!["A".to_string()],
            shutdown_timeout: None,
        },
        Arc::new(client_for(&mock_server)),
    )
    .unwrap();
    dispatcher.start().unwrap();

    for i in 0..4 {
        dispatcher.enqueue(Job::new(format!("62811{}", i), "hi")).unwrap();
    }
    dispatcher.stop().await.unwrap();

    let stats = dispatcher.stats();
    assert_eq!(stats.failed, 4);
    assert_eq!(stats.delivered, 0);
}
