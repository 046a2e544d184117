mod common;

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::{Method, StatusCode},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};
use vocab_backend::seeds::level_test_questions;

use common::{app, call, sign_up};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind should succeed");
    let addr = listener.local_addr().expect("listener has an address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server should run");
    });
    addr
}

async fn create_level_test(app: &Router, client: &str) -> String {
    let r = call(app, Method::POST, "/api/v1/quiz", Some(client), Some(json!({"mode": "level_test"}))).await;
    assert_eq!(r.status, StatusCode::CREATED);
    r.json["quiz"]["quizId"].as_str().unwrap().to_string()
}

async fn send(ws: &mut Ws, msg: Value) {
    ws.send(Message::Text(msg.to_string().into())).await.expect("send should succeed");
}

/// Read messages until one matches, failing after a few seconds.
async fn wait_for(ws: &mut Ws, what: &str, pred: impl Fn(&Value) -> bool) -> Value {
    let read = async {
        while let Some(msg) = ws.next().await {
            if let Message::Text(text) = msg.expect("socket should stay healthy") {
                let v: Value = serde_json::from_str(text.as_str()).expect("server sends JSON");
                if pred(&v) {
                    return v;
                }
            }
        }
        panic!("socket closed while waiting for {what}");
    };
    tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
}

#[tokio::test]
async fn socket_streams_state_and_answer_results() {
    let app = app();
    sign_up(&app, "sock").await;
    let id = create_level_test(&app, "sock").await;
    let addr = serve(app).await;

    let (mut ws, _) = connect_async(format!("ws://{addr}/ws/quiz/{id}?clientId=sock"))
        .await
        .expect("upgrade should succeed");

    let initial = wait_for(&mut ws, "initial state", |v| v["type"] == "state").await;
    assert_eq!(initial["quiz"]["phase"], "not_started");
    assert_eq!(initial["quiz"]["timeLeftSeconds"], 180);

    send(&mut ws, json!({"type": "ping"})).await;
    wait_for(&mut ws, "pong", |v| v["type"] == "pong").await;

    send(&mut ws, json!({"type": "start"})).await;
    wait_for(&mut ws, "started state", |v| v["quiz"]["phase"] == "in_progress").await;

    let right = level_test_questions()[0].correct_text().to_string();
    send(&mut ws, json!({"type": "answer", "selectedOption": right})).await;
    let result = wait_for(&mut ws, "answer result", |v| v["type"] == "answer_result").await;
    assert_eq!(result["outcome"], "correct");
    assert_eq!(result["points"], 2);

    // Countdown ticks and the level-test auto-advance arrive without any client message.
    let ticked = wait_for(&mut ws, "a countdown tick", |v| {
        v["quiz"]["timeLeftSeconds"].as_u64().is_some_and(|t| t < 180)
    })
    .await;
    assert_eq!(ticked["type"], "state");
    let advanced = wait_for(&mut ws, "auto-advance", |v| v["quiz"]["currentQuestionIndex"] == 1).await;
    assert_eq!(advanced["quiz"]["phase"], "in_progress");
    assert_eq!(advanced["quiz"]["score"], 2);

    ws.send(Message::Text("not json".to_string().into())).await.expect("send should succeed");
    let err = wait_for(&mut ws, "error reply", |v| v["type"] == "error").await;
    assert!(err["message"].as_str().unwrap().starts_with("Invalid JSON"));
}

fn rejected_status(result: Result<(Ws, impl Sized), WsError>) -> StatusCode {
    match result {
        Err(WsError::Http(resp)) => StatusCode::from_u16(resp.status().as_u16()).unwrap(),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("upgrade should have been refused"),
    }
}

#[tokio::test]
async fn socket_upgrade_needs_session_and_own_quiz() {
    let app = app();
    sign_up(&app, "owner").await;
    sign_up(&app, "stranger").await;
    let id = create_level_test(&app, "owner").await;
    let addr = serve(app).await;

    let anonymous = connect_async(format!("ws://{addr}/ws/quiz/{id}")).await;
    assert_eq!(rejected_status(anonymous), StatusCode::UNAUTHORIZED);

    let unknown = connect_async(format!("ws://{addr}/ws/quiz/missing?clientId=owner")).await;
    assert_eq!(rejected_status(unknown), StatusCode::NOT_FOUND);

    let foreign = connect_async(format!("ws://{addr}/ws/quiz/{id}?clientId=stranger")).await;
    assert_eq!(rejected_status(foreign), StatusCode::NOT_FOUND);

    let own = connect_async(format!("ws://{addr}/ws/quiz/{id}?clientId=owner")).await;
    assert!(own.is_ok());
}
