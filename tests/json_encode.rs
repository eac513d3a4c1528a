use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use webtoolkit::{JsonResponse, Tools};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn write_json_sets_status_headers_and_body() {
    let tools = Tools::default();
    let mut extra = HeaderMap::new();
    extra.insert("x-request-id", HeaderValue::from_static("abc123"));
    extra.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));

    let payload = JsonResponse::success("saved", Some(json!({ "id": 7 })));
    let response = tools
        .write_json(StatusCode::ACCEPTED, &payload, Some(&extra))
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(response.headers()["x-request-id"], "abc123");
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(
        response.headers().get_all(header::CONTENT_TYPE).iter().count(),
        1
    );
    assert_eq!(
        body_json(response).await,
        json!({ "error": false, "message": "saved", "data": { "id": 7 } })
    );
}

#[tokio::test]
async fn write_json_accepts_plain_values() {
    let response = Tools::default()
        .write_json(StatusCode::OK, &vec!["a", "b"], None)
        .unwrap();
    assert_eq!(body_json(response).await, json!(["a", "b"]));
}

#[tokio::test]
async fn write_json_reports_unencodable_payloads() {
    use std::collections::HashMap;
    let mut bad = HashMap::new();
    bad.insert(vec![1u8], "tuple keys are not valid JSON object keys");

    let err = Tools::default()
        .write_json(StatusCode::OK, &bad, None)
        .expect_err("non-string map keys cannot be encoded");
    assert!(err.to_string().starts_with("failed to encode JSON response"));
}

#[tokio::test]
async fn error_json_defaults_to_bad_request() {
    let tools = Tools::default();
    let response = tools.error_json(&"widget missing", None).unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": true, "message": "widget missing" })
    );
}

#[tokio::test]
async fn error_json_uses_explicit_status() {
    let tools = Tools::default();
    let err = std::io::Error::new(std::io::ErrorKind::Other, "database offline");
    let response = tools
        .error_json(&err, Some(StatusCode::SERVICE_UNAVAILABLE))
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["error"], json!(true));
    assert_eq!(body["message"], json!("database offline"));
    assert!(body.get("data").is_none());
}
