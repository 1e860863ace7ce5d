use base64::Engine as _;
use instacap::{
    ai::MockVisionClient,
    app::{App, AppServices},
    captions::{CaptionLimits, ResponseCache},
    models::{CaptionsResponse, ErrorResponse, DEFAULT_CATEGORY},
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

fn png_data_url(seed: u8) -> String {
    let mut bytes = PNG_HEADER.to_vec();
    bytes.push(seed);
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Serve the real router on a loopback port and return its base URL.
async fn spawn_app(vision: MockVisionClient) -> String {
    let app = App::with_services(
        AppServices {
            vision: Arc::new(vision),
            cache: Arc::new(ResponseCache::new(32, Duration::from_secs(60))),
            limits: CaptionLimits::default(),
        },
        1024 * 1024,
    );
    let router = app.router();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}

async fn post_captions(base: &str, body: serde_json::Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/api/generate-captions", base))
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_generate_captions_returns_normalized_captions() {
    let vision = MockVisionClient::new().with_reply(
        r##"Here you go: {"captions": [
            {"text": "Sunset state of mind", "category": "Aesthetic", "hashtags": ["#sunset"], "emojis": ["🌅"]},
            {"text": "Beach please", "category": "Funny"}
        ]}"##,
    );
    let base = spawn_app(vision.clone()).await;

    let response = post_captions(
        &base,
        json!({
            "imageData": [png_data_url(1)],
            "tone": "cool",
            "includeHashtags": true,
            "includeEmojis": true
        }),
    )
    .await;
    assert_eq!(response.status(), 200);

    let body: CaptionsResponse = response.json().await.unwrap();
    assert_eq!(body.captions.len(), 2);
    assert_eq!(body.captions[0].hashtags, vec!["#sunset"]);
    assert_eq!(body.captions[1].category, "Funny");
    assert!(body.captions[1].hashtags.is_empty());
    assert!(body.captions[1].emojis.is_empty());
    assert_eq!(vision.get_call_count(), 1);
}

#[tokio::test]
async fn test_disabled_hashtags_and_emojis_are_empty() {
    let vision = MockVisionClient::new();
    let base = spawn_app(vision).await;

    let response = post_captions(
        &base,
        json!({
            "imageData": [png_data_url(1)],
            "includeHashtags": false,
            "includeEmojis": false
        }),
    )
    .await;
    assert_eq!(response.status(), 200);

    let body: CaptionsResponse = response.json().await.unwrap();
    assert!(body
        .captions
        .iter()
        .all(|c| c.hashtags.is_empty() && c.emojis.is_empty()));
}

#[tokio::test]
async fn test_plain_text_reply_becomes_single_caption() {
    let vision = MockVisionClient::new().with_reply("Living my best life");
    let base = spawn_app(vision).await;

    let response = post_captions(&base, json!({ "imageData": [png_data_url(1)] })).await;
    assert_eq!(response.status(), 200);

    let body: CaptionsResponse = response.json().await.unwrap();
    assert_eq!(body.captions.len(), 1);
    assert_eq!(body.captions[0].text, "Living my best life");
    assert_eq!(body.captions[0].category, DEFAULT_CATEGORY);
}

#[tokio::test]
async fn test_empty_image_list_is_bad_request() {
    let vision = MockVisionClient::new();
    let base = spawn_app(vision.clone()).await;

    let response = post_captions(&base, json!({ "imageData": [] })).await;
    assert_eq!(response.status(), 400);

    let body: ErrorResponse = response.json().await.unwrap();
    assert!(!body.error.is_empty());
    assert_eq!(vision.get_call_count(), 0);
}

#[tokio::test]
async fn test_unrecognized_image_is_bad_request() {
    let vision = MockVisionClient::new();
    let base = spawn_app(vision.clone()).await;

    let response = post_captions(
        &base,
        json!({ "imageData": ["data:image/png;base64,SGVsbG8gd29ybGQ="] }),
    )
    .await;
    assert_eq!(response.status(), 400);

    let body: ErrorResponse = response.json().await.unwrap();
    assert!(body.error.contains("image 0"));
    assert_eq!(vision.get_call_count(), 0);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let base = spawn_app(MockVisionClient::new()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/generate-captions", base))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: ErrorResponse = response.json().await.unwrap();
    assert!(body.error.starts_with("Invalid request body"));
}

#[tokio::test]
async fn test_provider_failures_map_to_status_codes() {
    let cases = [
        (MockVisionClient::new().with_rate_limit(), 429),
        (MockVisionClient::new().with_rejection(), 400),
        (MockVisionClient::new().with_failure(), 500),
    ];

    for (vision, expected) in cases {
        let base = spawn_app(vision).await;
        let response = post_captions(&base, json!({ "imageData": [png_data_url(1)] })).await;
        assert_eq!(response.status().as_u16(), expected);

        let body: ErrorResponse = response.json().await.unwrap();
        assert!(!body.error.is_empty());
    }
}

#[tokio::test]
async fn test_identical_requests_call_upstream_once() {
    let vision = MockVisionClient::new();
    let base = spawn_app(vision.clone()).await;
    let body = json!({
        "imageData": [png_data_url(7)],
        "tone": "casual",
        "categories": ["Travel", "Food"]
    });

    let first: CaptionsResponse = post_captions(&base, body.clone())
        .await
        .json()
        .await
        .unwrap();
    let second: CaptionsResponse = post_captions(&base, body).await.json().await.unwrap();

    assert_eq!(first.captions, second.captions);
    assert_eq!(vision.get_call_count(), 1);
}

#[tokio::test]
async fn test_more_than_three_images_are_capped() {
    let vision = MockVisionClient::new();
    let base = spawn_app(vision.clone()).await;

    let images: Vec<String> = (0..6).map(png_data_url).collect();
    let response = post_captions(&base, json!({ "imageData": images })).await;
    assert_eq!(response.status(), 200);

    assert_eq!(vision.requests()[0].images.len(), 3);
}

#[tokio::test]
async fn test_health() {
    let base = spawn_app(MockVisionClient::new()).await;

    let response = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "status": "ok" }));
}
