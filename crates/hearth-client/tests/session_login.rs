//! Login → device enumeration → subscribe-every-base-station, driven
//! against a fake cloud endpoint (spec.md §8 S1/S2).

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event as AxumEvent, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Url;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tokio::time::Duration;

use hearth_client::{Session, SessionError};

struct FakeServerState {
    login_success: bool,
    sse_tx: broadcast::Sender<String>,
}

async fn start_fake_server(login_success: bool) -> Url {
    let (sse_tx, _) = broadcast::channel(32);
    let state = Arc::new(FakeServerState {
        login_success,
        sse_tx: sse_tx.clone(),
    });

    // A broadcast send with no subscriber yet is simply dropped, so the
    // "connected" frame has to be pushed after the client's SSE GET has had
    // time to reach `subscribe_handler` and register a receiver.
    let push_tx = sse_tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = push_tx.send(json!({"status": "connected"}).to_string());
    });

    let app = Router::new()
        .route("/login/v2", post(login_handler))
        .route("/users/devices", get(devices_handler))
        .route("/client/subscribe", get(subscribe_handler))
        .route("/users/devices/notify/{device_id}", post(notify_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/")).unwrap()
}

async fn login_handler(State(state): State<Arc<FakeServerState>>) -> Json<Value> {
    if state.login_success {
        Json(json!({"success": true, "data": {"token": "T123", "userId": "user1"}}))
    } else {
        Json(json!({"success": false, "data": {"reason": "bad credentials"}}))
    }
}

async fn devices_handler() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": [{
            "deviceId": "bs1",
            "parentId": "bs1",
            "deviceType": "basestation",
            "xCloudId": "cloud-1",
            "userId": "user1",
        }],
    }))
}

async fn subscribe_handler(
    State(state): State<Arc<FakeServerState>>,
) -> Sse<impl futures_util::Stream<Item = Result<AxumEvent, Infallible>>> {
    let rx = state.sse_tx.subscribe();
    let events = futures_util::stream::unfold(rx, |mut rx| async move {
        match rx.recv().await {
            Ok(data) => Some((Ok(AxumEvent::default().data(data)), rx)),
            Err(_) => None,
        }
    });
    Sse::new(events)
}

async fn notify_handler(
    State(state): State<Arc<FakeServerState>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let reply = json!({
        "action": "is",
        "resource": body["resource"],
        "properties": {},
        "transId": body["transId"],
        "from": body["to"],
        "to": body["from"],
    });
    let _ = state.sse_tx.send(reply.to_string());
    Json(json!({"success": true}))
}

// S1: valid credentials, one base station whose SSE immediately connects and
// acks the initial ping. Login returns without error, the base station is
// connected.
#[tokio::test]
async fn s1_login_succeeds_and_base_station_is_connected() {
    let base_url = start_fake_server(true).await;
    let session = tokio::time::timeout(Duration::from_secs(2), Session::login(base_url, "a@b.com", "pw"))
        .await
        .expect("login should not hang")
        .expect("login should succeed");

    let base_stations = session.base_stations().await;
    assert_eq!(base_stations.len(), 1);
    assert!(base_stations[0].is_connected());
}

// S2: server reports success:false on login. AuthFailed, no SSE opened.
#[tokio::test]
async fn s2_login_failure_returns_auth_failed() {
    let base_url = start_fake_server(false).await;
    let result = Session::login(base_url, "a@b.com", "wrong").await;
    assert!(matches!(result, Err(SessionError::AuthFailed(_))));
}

#[tokio::test]
async fn logout_is_idempotent() {
    let base_url = start_fake_server(true).await;
    let session = Session::login(base_url, "a@b.com", "pw").await.unwrap();
    session.logout().await.unwrap();
    session.logout().await.unwrap();
}
