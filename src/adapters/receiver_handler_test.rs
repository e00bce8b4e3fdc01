use super::metrics_handler::MetricsCollector;
use super::receiver_handler::{axum_path, receiver_router};
use crate::domain::{Endpoint, HttpMethod};
use crate::schema::{ExtraFields, FieldDescriptor, FieldList};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

fn order_endpoint() -> Endpoint {
    let fields = vec![
        FieldDescriptor::new("id", "string").required(),
        FieldDescriptor::new("quantity", "integer")
            .required()
            .bounds(Some(1.0), Some(10.0)),
        FieldDescriptor::new("note", "string"),
    ];
    Endpoint {
        url: "/orders".to_string(),
        method: HttpMethod::Post,
        description: Some("Create order".to_string()),
        body: Some(FieldList::new(&fields).to_node("RequestModel").unwrap()),
    }
}

fn app(extra_fields: ExtraFields) -> Router {
    let endpoints = vec![
        order_endpoint(),
        Endpoint {
            url: "/orders".to_string(),
            method: HttpMethod::Get,
            description: None,
            body: None,
        },
    ];
    receiver_router(endpoints, extra_fields, Arc::new(MetricsCollector::new().unwrap()))
}

async fn call(app: Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .method(method)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_valid_payload_is_echoed() {
    let (status, body) = call(
        app(ExtraFields::Drop),
        "POST",
        "/orders",
        r#"{"id": "A-1", "quantity": 3, "unknown": true}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Valid");
    assert_eq!(body["data"], json!({ "id": "A-1", "quantity": 3 }));
}

#[tokio::test]
async fn test_invalid_payload_lists_every_error() {
    let (status, body) = call(
        app(ExtraFields::Drop),
        "POST",
        "/orders",
        r#"{"quantity": 42}"#,
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Invalid");
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().any(|e| e["path"] == "id" && e["kind"] == "missing"));
    assert!(errors
        .iter()
        .any(|e| e["path"] == "quantity" && e["kind"] == "out_of_bounds"));
}

#[tokio::test]
async fn test_rejected_extra_field() {
    let (status, body) = call(
        app(ExtraFields::Reject),
        "POST",
        "/orders",
        r#"{"id": "A-1", "quantity": 3, "unknown": true}"#,
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["kind"], "unexpected_field");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (status, _) = call(app(ExtraFields::Drop), "POST", "/orders", "{oops").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_route_on_same_path() {
    let (status, body) = call(app(ExtraFields::Drop), "GET", "/orders", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Valid" }));
}

#[tokio::test]
async fn test_undeclared_method_is_rejected() {
    let (status, _) = call(app(ExtraFields::Drop), "DELETE", "/orders", "").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_path_parameters_are_routed() {
    let endpoint = Endpoint {
        url: "/orders/{orderId}".to_string(),
        method: HttpMethod::Delete,
        description: None,
        body: None,
    };
    let app = receiver_router(
        vec![endpoint],
        ExtraFields::Drop,
        Arc::new(MetricsCollector::new().unwrap()),
    );
    let (status, _) = call(app, "DELETE", "/orders/42", "").await;
    assert_eq!(status, StatusCode::OK);
}

#[test]
fn test_axum_path() {
    assert_eq!(axum_path("/orders/{id}/lines/{line}"), "/orders/:p2/lines/:p4");
    assert_eq!(axum_path("/orders/{orderId}/lines/{n}"), "/orders/:p2/lines/:p4");
    assert_eq!(axum_path("/plain"), "/plain");
}

#[tokio::test]
async fn test_differently_named_captures_share_a_route() {
    let endpoints = vec![
        Endpoint {
            url: "/orders/{id}".to_string(),
            method: HttpMethod::Get,
            description: None,
            body: None,
        },
        Endpoint {
            url: "/orders/{orderId}".to_string(),
            method: HttpMethod::Delete,
            description: None,
            body: None,
        },
        Endpoint {
            url: "/orders/{orderId}/lines".to_string(),
            method: HttpMethod::Get,
            description: None,
            body: None,
        },
    ];
    let app = receiver_router(
        endpoints,
        ExtraFields::Drop,
        Arc::new(MetricsCollector::new().unwrap()),
    );

    let (status, _) = call(app.clone(), "GET", "/orders/7", "").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(app.clone(), "DELETE", "/orders/7", "").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(app.clone(), "GET", "/orders/7/lines", "").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(app, "PUT", "/orders/7", "").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
