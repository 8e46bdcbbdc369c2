use std::str::FromStr;

use feed_consumer::{feed::FeedClient, models::PositionMessage};
use reqwest::Url;
use tokio::io::AsyncReadExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method},
};

#[tokio::test]
async fn test_streamer_yields_the_response_body_as_a_byte_stream() {
    let server = MockServer::start().await;

    let pos = PositionMessage::test_default(None);
    let mut body = serde_json::to_string(&pos).unwrap();
    body.push('\n');

    Mock::given(method("POST"))
        .and(header("Authorization", "bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.clone(), "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let client = FeedClient::new(
        Url::from_str(&server.uri()).unwrap(),
        Some("test-token".to_string()),
    );

    let mut source = client.streamer().await.unwrap();
    let mut received = String::new();
    source.read_to_string(&mut received).await.unwrap();

    assert_eq!(received, body);
}

#[tokio::test]
async fn test_streamer_surfaces_non_ok_responses() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("feed unavailable"))
        .mount(&server)
        .await;

    let client = FeedClient::new(Url::from_str(&server.uri()).unwrap(), None);

    match client.streamer().await {
        Err(feed_consumer::error::Error::FailedRequest { status, body, .. }) => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(body, "feed unavailable");
        }
        other => panic!("expected a failed request error, got {:?}", other.err()),
    }
}
