//! reqwest adapter against a local mock server

use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reelx_cli::adapters::ReqwestHttpAdapter;
use reelx_cli::ports::{HttpPort, HttpRequest};

#[tokio::test]
async fn test_get_returns_status_type_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/streams/ABCDEFGHIJK"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"{"title":"x"}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let http = ReqwestHttpAdapter::new().unwrap();
    let response = http
        .send(&HttpRequest::get(format!("{}/streams/ABCDEFGHIJK", server.uri())))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.content_type.as_deref(), Some("application/json"));
    assert_eq!(response.body, br#"{"title":"x"}"#.to_vec());
    assert!(!response.body_limit_exceeded);
}

#[tokio::test]
async fn test_error_status_is_returned_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&server)
        .await;

    let http = ReqwestHttpAdapter::new().unwrap();
    let response = http
        .send(&HttpRequest::get(format!("{}/anything", server.uri())))
        .await
        .unwrap();

    assert_eq!(response.status, 503);
    assert!(!response.is_success());
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_post_sends_json_body_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/json"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({ "url": "https://www.youtube.com/watch?v=ABCDEFGHIJK" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "url": "https://cdn/x.mp4" })))
        .expect(1)
        .mount(&server)
        .await;

    let http = ReqwestHttpAdapter::new().unwrap();
    let request = HttpRequest::post_json(
        format!("{}/api/json", server.uri()),
        &serde_json::json!({ "url": "https://www.youtube.com/watch?v=ABCDEFGHIJK" }),
    );
    let response = http.send(&request).await.unwrap();
    assert!(response.is_success());
}

#[tokio::test]
async fn test_body_over_limit_is_not_buffered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![7u8; 4096], "video/mp4"))
        .mount(&server)
        .await;

    let http = ReqwestHttpAdapter::new().unwrap();
    let request = HttpRequest::get(format!("{}/big.mp4", server.uri())).with_body_limit(1024);
    let response = http.send(&request).await.unwrap();

    assert!(response.body_limit_exceeded);
    assert!(response.body.len() <= 1024);
    assert_eq!(response.content_type.as_deref(), Some("video/mp4"));
}

#[tokio::test]
async fn test_no_referer_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let http = ReqwestHttpAdapter::new().unwrap();
    http.send(&HttpRequest::get(format!("{}/r", server.uri())))
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(!received[0].headers.contains_key("referer"));
}
