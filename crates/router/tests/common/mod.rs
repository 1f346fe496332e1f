#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Request, Response, StatusCode};
use axum::routing::post;
use axum::Router;
use http_body_util::BodyExt;
use tokio::net::TcpListener;
use tower::ServiceExt;

use mia_core::pool::{WorkerAddress, WorkerPool};
use mia_router::config::RouterConfig;
use mia_router::dispatcher::Dispatcher;
use mia_router::router::build_app_router;
use mia_router::state::AppState;

// ---------------------------------------------------------------------------
// Mock workers
// ---------------------------------------------------------------------------

/// How a mock worker answers `POST /animate`.
#[derive(Debug, Clone)]
pub enum MockBehaviour {
    /// 200 with `{"worker": <name>, ...}` so tests can tell workers apart.
    Identify,
    /// Fixed status, content type and raw body.
    Reply {
        status: StatusCode,
        content_type: &'static str,
        body: &'static [u8],
    },
    /// Sleep before answering like [`MockBehaviour::Identify`].
    Slow(Duration),
}

/// A real HTTP server on a loopback port that records what it received.
pub struct MockWorker {
    pub address: WorkerAddress,
    hits: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<(HeaderMap, Bytes)>>>,
}

impl MockWorker {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<(HeaderMap, Bytes)> {
        self.last_request.lock().unwrap().clone()
    }
}

/// Spawn a mock worker on `127.0.0.1:0`.
pub async fn spawn_worker(name: &'static str, behaviour: MockBehaviour) -> MockWorker {
    let hits = Arc::new(AtomicUsize::new(0));
    let last_request = Arc::new(Mutex::new(None));

    let app = {
        let hits = hits.clone();
        let last_request = last_request.clone();
        Router::new().route(
            "/animate",
            post(move |headers: HeaderMap, body: Bytes| {
                let hits = hits.clone();
                let last_request = last_request.clone();
                let behaviour = behaviour.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    *last_request.lock().unwrap() = Some((headers, body));
                    mock_reply(name, behaviour).await
                }
            }),
        )
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockWorker {
        address: WorkerAddress::new("127.0.0.1", addr.port()),
        hits,
        last_request,
    }
}

async fn mock_reply(name: &'static str, behaviour: MockBehaviour) -> Response<Body> {
    let identify = || {
        let body = serde_json::json!({
            "worker": name,
            "mesh_base64": "Z2xURg==",
            "gif_base64": null,
            "thumbnail_base64": null,
        });
        Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    match behaviour {
        MockBehaviour::Identify => identify(),
        MockBehaviour::Reply {
            status,
            content_type,
            body,
        } => Response::builder()
            .status(status)
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap(),
        MockBehaviour::Slow(delay) => {
            tokio::time::sleep(delay).await;
            identify()
        }
    }
}

/// An address nothing is listening on.
pub async fn dead_address() -> WorkerAddress {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    drop(listener);
    WorkerAddress::new("127.0.0.1", addr.port())
}

/// An address that accepts connections and closes them without answering.
pub async fn hangup_address() -> WorkerAddress {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            drop(stream);
        }
    });
    WorkerAddress::new("127.0.0.1", addr.port())
}

// ---------------------------------------------------------------------------
// Router under test
// ---------------------------------------------------------------------------

pub struct TestRouter {
    pub app: Router,
    pub dispatcher: Arc<Dispatcher>,
}

/// Build the full router stack in front of `workers`.
pub fn build_test_router(workers: &[WorkerAddress], timeout: Duration) -> TestRouter {
    build_router(workers, timeout, None)
}

/// Like [`build_test_router`] with `MAX_BODY_BYTES` set.
pub fn build_limited_router(
    workers: &[WorkerAddress],
    timeout: Duration,
    max_body_bytes: usize,
) -> TestRouter {
    build_router(workers, timeout, Some(max_body_bytes))
}

fn build_router(
    workers: &[WorkerAddress],
    timeout: Duration,
    max_body_bytes: Option<usize>,
) -> TestRouter {
    let urls = workers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    let config = RouterConfig::from_lookup(|key| match key {
        "MIA_ENV" => Some("dev".to_string()),
        "WORKER_URLS" => Some(urls.clone()),
        "MAX_BODY_BYTES" => max_body_bytes.map(|n| n.to_string()),
        _ => None,
    })
    .unwrap();

    let pool = WorkerPool::new(config.workers.clone()).unwrap();
    let dispatcher = Arc::new(Dispatcher::new(pool, timeout).unwrap());
    let state = AppState {
        dispatcher: dispatcher.clone(),
    };

    TestRouter {
        app: build_app_router(state, &config),
        dispatcher,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub const ANIMATE_BODY: &str =
    r#"{"mesh_b64_str":"Z2xURgIAAAA=","animation_name":"running","inplace":false}"#;

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_animate(app: Router, headers: &[(&str, &str)], body: &str) -> Response<Body> {
    let mut builder = Request::post("/animate").header(CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    app.oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
