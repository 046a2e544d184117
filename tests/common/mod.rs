use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use vocab_backend::{
    build_router, config::AppConfig, state::AppState, storage::MemoryStore,
};

pub fn app() -> Router {
    build_router(Arc::new(AppState::new(
        AppConfig::default(),
        Arc::new(MemoryStore::new()),
        None,
    )))
}

pub struct Reply {
    pub status: StatusCode,
    pub location: Option<String>,
    pub json: Value,
}

pub async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    client: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(client) = client {
        req = req.header("x-client-id", client);
    }
    let body = match body {
        Some(v) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app
        .clone()
        .oneshot(req.body(body).expect("request build should succeed"))
        .await
        .expect("router should respond");

    let status = resp.status();
    let location = resp
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    Reply { status, location, json }
}

pub async fn sign_up(app: &Router, client: &str) -> Value {
    let r = call(
        app,
        Method::POST,
        "/api/v1/auth/signup",
        Some(client),
        Some(serde_json::json!({
            "name": "Ana Ruiz",
            "email": format!("{client}@example.com"),
            "password": "secret"
        })),
    )
    .await;
    assert_eq!(r.status, StatusCode::OK, "signup failed: {}", r.json);
    r.json["user"].clone()
}
