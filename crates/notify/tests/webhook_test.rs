//! Delivery tests against a local mock webhook.

use std::time::Duration;

use alerter_notify::{AlertPayload, Delivery, WebhookClient};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> WebhookClient {
    WebhookClient::new(Duration::from_secs(4), Duration::from_secs(6)).unwrap()
}

#[tokio::test]
async fn posts_json_and_accepts_2xx() {
    let server = MockServer::start().await;
    let payload = AlertPayload::connectivity_test();
    let expected = serde_json::to_value(&payload).unwrap();

    Mock::given(method("POST"))
        .and(path("/services/hook"))
        .and(header("content-type", "application/json"))
        .and(wiremock::matchers::body_json(&expected))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/services/hook", server.uri());
    assert!(client().post(&url, &payload).await);
}

#[tokio::test]
async fn any_success_status_counts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    assert!(client().post(&server.uri(), &AlertPayload::connectivity_test()).await);
}

#[tokio::test]
async fn non_success_status_returns_false() {
    for status in [400u16, 404, 500, 503] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&server)
            .await;

        assert!(
            !client().post(&server.uri(), &AlertPayload::connectivity_test()).await,
            "status {status} should not count as delivered"
        );
    }
}

#[tokio::test]
async fn redirect_is_not_followed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/elsewhere"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/elsewhere"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let url = format!("{}/hook", server.uri());
    assert!(!client().post(&url, &AlertPayload::connectivity_test()).await);

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].method.as_str(), "POST");
    assert_eq!(received[0].url.path(), "/hook");
}

#[tokio::test]
async fn surrounding_whitespace_in_url_is_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("  {}  ", server.uri());
    assert!(client().post(&url, &AlertPayload::connectivity_test()).await);
}

#[tokio::test]
async fn slow_webhook_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let client = WebhookClient::new(Duration::from_secs(1), Duration::from_millis(200)).unwrap();
    assert!(!client.post(&server.uri(), &AlertPayload::connectivity_test()).await);
}

#[tokio::test]
async fn connection_refused_returns_false() {
    // Nothing listens on port 1.
    assert!(!client().post("http://127.0.0.1:1/hook", &AlertPayload::connectivity_test()).await);
}

#[tokio::test]
async fn test_method_posts_connectivity_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client().test(&server.uri()).await);
    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["blocks"][0]["text"]["text"], "[TEST] Error Alerter");
}
