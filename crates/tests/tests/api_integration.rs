use std::path::PathBuf;
use std::time::Duration;

use aero_agents::AppConfig;
use aero_api::{build_app, ApiConfig};
use aero_core::replies::{EMPTY_INPUT, NOT_ENOUGH_INFORMATION, NO_AIRLINES_FOUND};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::json;
use tower::ServiceExt;

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data")
}

async fn app() -> Router {
    let config = ApiConfig {
        app: AppConfig {
            template_seed: Some(42),
            ..AppConfig::with_data_dir(data_dir())
        },
        turn_timeout: Duration::from_secs(5),
        ..ApiConfig::default()
    };
    build_app(config).await.expect("app should build")
}

fn post_message(body: String, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/message")
        .header("content-type", "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

fn say(text: &str, cookie: Option<&str>) -> Request<Body> {
    post_message(json!({ "message": text }).to_string(), cookie)
}

fn session_cookie(response: &Response) -> Option<String> {
    let raw = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    raw.split(';').next().map(str::to_string)
}

async fn message_of(response: Response) -> String {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    parsed["message"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn health_reports_model_and_metrics() {
    let response = app()
        .await
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["model"], "tfidf-logistic");
    assert_eq!(parsed["intent_tags"], 8);
    assert!(parsed["metrics"].get("turns_total").is_some());
}

#[tokio::test]
async fn blank_or_unreadable_messages_are_rejected() {
    let app = app().await;
    for body in [
        json!({ "message": "   " }).to_string(),
        json!({ "text": "hello" }).to_string(),
        "not json".to_string(),
    ] {
        let response = app.clone().oneshot(post_message(body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(message_of(response).await, EMPTY_INPUT);
    }
}

#[tokio::test]
async fn airline_lookup_then_recommendation_in_one_session() {
    let app = app().await;

    let first = app
        .clone()
        .oneshot(say("I want to fly from SYD to MEL", None))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let cookie = session_cookie(&first).expect("session cookie issued");
    assert!(cookie.starts_with("aero_session="));
    let listed = message_of(first).await;
    assert!(listed.contains("Qantas or Jetstar"), "{listed}");

    let second = app
        .clone()
        .oneshot(say("what do you recommend", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert!(second.headers().get(header::SET_COOKIE).is_none());
    let recommended = message_of(second).await;
    assert!(recommended.contains("Jetstar"), "{recommended}");
}

#[tokio::test]
async fn recommendation_in_a_fresh_session_has_no_airlines() {
    let response = app()
        .await
        .oneshot(say("what do you recommend", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(message_of(response).await, NO_AIRLINES_FOUND);
}

#[tokio::test]
async fn tag_without_responses_gets_the_not_enough_information_reply() {
    let response = app()
        .await
        .oneshot(say("What is the weather like?", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(message_of(response).await, NOT_ENOUGH_INFORMATION);
}

#[tokio::test]
async fn end_chat_discards_the_remembered_route() {
    let app = app().await;

    let first = app
        .clone()
        .oneshot(say("I want to fly from SYD to MEL", None))
        .await
        .unwrap();
    let cookie = session_cookie(&first).expect("session cookie issued");

    let ended = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/end_chat")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(ended.status(), StatusCode::OK);
    let cleared = ended
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cleared.contains("Max-Age=0"));

    let after = app
        .clone()
        .oneshot(say("what do you recommend", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(message_of(after).await, NO_AIRLINES_FOUND);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let response = app()
        .await
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().get("x-request-id").is_some());
}
