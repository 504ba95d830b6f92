use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use httpmock::prelude::*;
use menu_visualizer::core::enrichment::{FailurePolicy, PLACEHOLDER_IMAGE_B64};
use menu_visualizer::{router, AppState, MenuCollection, MenuEngine, ServiceConfig};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

const MENU_URL: &str = "https://menus.example.com/italian-menu.jpg";
const PIZZA_IMAGE: &str = "cGl6emEtcGhvdG8=";
const TIRAMISU_IMAGE: &str = "dGlyYW1pc3UtcGhvdG8=";

fn config_for(server: &MockServer) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.provider.base_url = server.url("/v1");
    config.provider.api_key = Some("together-test-key".to_string());
    config
}

fn italian_completion() -> serde_json::Value {
    let content = json!({
        "items": [
            { "name": "Margherita Pizza", "price": "$12", "description": "Tomato, mozzarella, fresh basil" },
            { "name": "Tiramisu", "price": "$8", "description": "Coffee-soaked ladyfingers, mascarpone" }
        ]
    })
    .to_string();

    json!({
        "id": "chatcmpl-42",
        "object": "chat.completion",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}

async fn post_menu(config: &ServiceConfig, body: serde_json::Value) -> (StatusCode, Vec<u8>) {
    let engine = MenuEngine::from_config(config).unwrap();
    let app = router(AppState::new(Arc::new(engine)));

    let request = Request::builder()
        .method("POST")
        .uri("/api/parseMenu")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn test_end_to_end_italian_menu() {
    let server = MockServer::start();

    let chat_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", "Bearer together-test-key")
            .body_contains(MENU_URL);
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(italian_completion());
    });

    let pizza_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/images/generations")
            .body_contains("Margherita Pizza, Tomato, mozzarella, fresh basil");
        then.status(200)
            .json_body(json!({ "data": [{ "b64_json": PIZZA_IMAGE }] }));
    });

    let tiramisu_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/images/generations")
            .body_contains("Tiramisu, Coffee-soaked ladyfingers, mascarpone");
        then.status(200)
            .json_body(json!({ "data": [{ "b64_json": TIRAMISU_IMAGE }] }));
    });

    let (status, body) = post_menu(&config_for(&server), json!({ "menuUrl": MENU_URL })).await;

    assert_eq!(status, StatusCode::OK);
    chat_mock.assert();
    pizza_mock.assert();
    tiramisu_mock.assert();

    let menu: MenuCollection = serde_json::from_slice(&body).unwrap();
    assert_eq!(menu.len(), 2);
    assert!(menu.items[0].name.contains("Margherita Pizza"));
    assert_eq!(menu.items[0].price, "$12");
    assert_eq!(menu.items[0].menu_image.b64_json, PIZZA_IMAGE);
    assert!(menu.items[1].name.contains("Tiramisu"));
    assert_eq!(menu.items[1].menu_image.b64_json, TIRAMISU_IMAGE);
}

#[tokio::test]
async fn test_missing_menu_url_never_reaches_provider() {
    let server = MockServer::start();
    let chat_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(italian_completion());
    });

    let (status, body) = post_menu(&config_for(&server), json!({ "imageUrl": MENU_URL })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({ "error": "No menu URL provided" }));
    assert_eq!(chat_mock.hits(), 0);
}

#[tokio::test]
async fn test_vision_error_skips_image_generation() {
    let server = MockServer::start();
    let chat_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(400)
            .json_body(json!({ "error": { "message": "Image could not be fetched" } }));
    });
    let image_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/images/generations");
        then.status(200)
            .json_body(json!({ "data": [{ "b64_json": PIZZA_IMAGE }] }));
    });

    let (status, body) = post_menu(&config_for(&server), json!({ "menuUrl": MENU_URL })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({ "error": "Failed to process menu" }));
    chat_mock.assert();
    assert_eq!(image_mock.hits(), 0);
}

#[tokio::test]
async fn test_malformed_vision_output_fails_request() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(json!({
            "choices": [{ "message": { "content": "Sorry, I cannot read this menu." } }]
        }));
    });
    let image_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/images/generations");
        then.status(200)
            .json_body(json!({ "data": [{ "b64_json": PIZZA_IMAGE }] }));
    });

    let (status, _) = post_menu(&config_for(&server), json!({ "menuUrl": MENU_URL })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(image_mock.hits(), 0);
}

#[tokio::test]
async fn test_failed_image_falls_back_to_placeholder() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(italian_completion());
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1/images/generations")
            .body_contains("Margherita Pizza");
        then.status(200)
            .json_body(json!({ "data": [{ "b64_json": PIZZA_IMAGE }] }));
    });
    let tiramisu_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/images/generations")
            .body_contains("Tiramisu");
        then.status(503).body("model overloaded");
    });

    let (status, body) = post_menu(&config_for(&server), json!({ "menuUrl": MENU_URL })).await;

    assert_eq!(status, StatusCode::OK);
    tiramisu_mock.assert();

    let menu: MenuCollection = serde_json::from_slice(&body).unwrap();
    assert_eq!(menu.len(), 2);
    assert_eq!(menu.items[0].menu_image.b64_json, PIZZA_IMAGE);
    assert_eq!(menu.items[1].menu_image.b64_json, PLACEHOLDER_IMAGE_B64);
}

#[tokio::test]
async fn test_abort_policy_never_sends_partial_menu() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(italian_completion());
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1/images/generations")
            .body_contains("Margherita Pizza");
        then.status(200)
            .json_body(json!({ "data": [{ "b64_json": PIZZA_IMAGE }] }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1/images/generations")
            .body_contains("Tiramisu");
        then.status(503).body("down");
    });

    // Default emission is incremental; abort must still answer with a clean error.
    let mut config = config_for(&server);
    config.enrichment.failure_policy = FailurePolicy::Abort;

    let (status, body) = post_menu(&config, json!({ "menuUrl": MENU_URL })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({ "error": "Failed to process menu" }));
}

#[tokio::test]
async fn test_helicone_proxy_headers() {
    let server = MockServer::start();

    let mut config = config_for(&server);
    config.provider.helicone_api_key = Some("helicone-test-key".to_string());
    config.provider.helicone_base_url = server.url("/helicone/v1");

    let chat_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/helicone/v1/chat/completions")
            .header("authorization", "Bearer together-test-key")
            .header("helicone-auth", "Bearer helicone-test-key")
            .header("helicone-property-menu", "true");
        then.status(200).json_body(italian_completion());
    });
    let image_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/helicone/v1/images/generations")
            .header("helicone-auth", "Bearer helicone-test-key")
            .header("helicone-property-menu", "true");
        then.status(200)
            .json_body(json!({ "data": [{ "b64_json": PIZZA_IMAGE }] }));
    });

    let (status, body) = post_menu(&config, json!({ "menuUrl": MENU_URL })).await;

    assert_eq!(status, StatusCode::OK);
    chat_mock.assert();
    image_mock.assert_hits(2);

    let menu: MenuCollection = serde_json::from_slice(&body).unwrap();
    assert_eq!(menu.len(), 2);
}
