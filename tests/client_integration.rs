use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::State,
    http::{HeaderMap as AxumHeaderMap, Method as AxumMethod, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use restwire::{header::HeaderMap, Json, RequestContext, RestClient, RestError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

#[derive(Clone)]
struct MockResponse {
    status: StatusCode,
    body: String,
    delay: Duration,
}

impl MockResponse {
    fn json(status: StatusCode, body: JsonValue) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::from_millis(0),
        }
    }

    fn text(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_owned(),
            delay: Duration::from_millis(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone, Debug)]
struct Received {
    method: String,
    path: String,
    headers: AxumHeaderMap,
    body: String,
}

#[derive(Clone)]
struct MockState {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    received: Arc<Mutex<Vec<Received>>>,
    hits: Arc<AtomicUsize>,
}

async fn handler(
    State(state): State<MockState>,
    method: AxumMethod,
    uri: Uri,
    headers: AxumHeaderMap,
    body: String,
) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state
        .received
        .lock()
        .expect("received log mutex must not be poisoned")
        .push(Received {
            method: method.to_string(),
            path: uri
                .path_and_query()
                .map(|value| value.to_string())
                .unwrap_or_default(),
            headers,
            body,
        });

    let response = {
        let mut queue = state
            .responses
            .lock()
            .expect("response queue mutex must not be poisoned");
        queue.pop_front().unwrap_or_else(|| {
            MockResponse::json(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "no mock response available"}),
            )
        })
    };

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    (response.status, response.body)
}

struct TestServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<Received>>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestServer {
    fn received(&self) -> Vec<Received> {
        self.received
            .lock()
            .expect("received log mutex must not be poisoned")
            .clone()
    }
}

async fn spawn_server(responses: Vec<MockResponse>) -> TestServer {
    let state = MockState {
        responses: Arc::new(Mutex::new(responses.into())),
        received: Arc::new(Mutex::new(Vec::new())),
        hits: Arc::new(AtomicUsize::new(0)),
    };

    let app = Router::new().fallback(handler).with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock server must run");
    });

    TestServer {
        base_url: format!("http://{address}"),
        hits: state.hits,
        received: state.received,
        task,
    }
}

#[derive(Debug, Deserialize, PartialEq)]
struct Item {
    id: u64,
    name: String,
}

#[derive(Debug, Serialize)]
struct NewItem {
    name: String,
}

#[tokio::test]
async fn get_resolves_against_base_url_and_decodes() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        json!({"id": 1, "name": "Kit"}),
    )])
    .await;
    let client = RestClient::builder()
        .base_url(&server.base_url)
        .header("X-Client", "restwire-tests")
        .build()
        .expect("client must build");

    let item = client
        .get::<Json<Item>>(None, "/items/1?expand=true", None)
        .await
        .expect("get must succeed")
        .into_json();

    assert_eq!(
        item,
        Item {
            id: 1,
            name: "Kit".to_owned()
        }
    );
    let received = server.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].method, "GET");
    assert_eq!(received[0].path, "/items/1?expand=true");
    assert_eq!(received[0].headers["x-client"], "restwire-tests");
}

#[tokio::test]
async fn post_sends_json_body_with_content_type() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::CREATED,
        json!({"id": 5, "name": "Kit"}),
    )])
    .await;
    let client = RestClient::builder()
        .base_url(&server.base_url)
        .build()
        .expect("client must build");

    let reply = client
        .post::<_, Json<Item>>(
            None,
            "/items",
            &NewItem {
                name: "Kit".to_owned(),
            },
            None,
        )
        .await
        .expect("post must succeed");

    assert_eq!(reply.response.status.as_u16(), 201);
    assert_eq!(reply.output.id, 5);
    let received = server.received();
    assert_eq!(received[0].method, "POST");
    assert_eq!(received[0].headers["content-type"], "application/json");
    assert_eq!(received[0].body, r#"{"name":"Kit"}"#);
}

#[tokio::test]
async fn retries_on_server_error() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"})),
        MockResponse::json(StatusCode::OK, json!({"id": 2, "name": "Renamed"})),
    ])
    .await;
    let client = RestClient::builder()
        .base_url(&server.base_url)
        .max_retries(1)
        .backoff(Duration::from_millis(1))
        .build()
        .expect("client must build");

    let item = client
        .put::<_, Json<Item>>(
            None,
            "/items/2",
            &json!({"name": "Renamed"}),
            None,
        )
        .await
        .expect("request must succeed after retry")
        .into_json();

    assert_eq!(item.name, "Renamed");
    assert_eq!(server.hits.load(Ordering::SeqCst), 2);
    let received = server.received();
    assert_eq!(received[0].body, received[1].body);
}

#[tokio::test]
async fn client_error_exhausts_retries_with_body() {
    let server = spawn_server(vec![
        MockResponse::text(StatusCode::NOT_FOUND, "missing"),
        MockResponse::text(StatusCode::NOT_FOUND, "still missing"),
    ])
    .await;
    let client = RestClient::builder()
        .base_url(&server.base_url)
        .max_retries(1)
        .build()
        .expect("client must build");

    let err = client
        .delete::<()>(None, "/items/404", None)
        .await
        .expect_err("404 must fail");

    assert_eq!(server.hits.load(Ordering::SeqCst), 2);
    match err {
        RestError::ExhaustedRetries { attempts, last, .. } => {
            assert_eq!(attempts, 2);
            match *last {
                RestError::HttpStatus { status, ref body } => {
                    assert_eq!(status, 404);
                    assert_eq!(body, "still missing");
                }
                ref other => panic!("expected http status error, got {other:?}"),
            }
        }
        other => panic!("expected exhausted retries, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_server_hits_the_client_deadline() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        json!({"id": 1, "name": "Kit"}),
    )
    .with_delay(Duration::from_millis(300))])
    .await;
    let client = RestClient::builder()
        .base_url(&server.base_url)
        .timeout(Duration::from_millis(50))
        .build()
        .expect("client must build");

    let err = client
        .get::<Json<Item>>(None, "/items/1", None)
        .await
        .expect_err("request must time out");

    assert!(
        matches!(
            err,
            RestError::DeadlineExceeded | RestError::ExhaustedRetries { .. }
        ),
        "unexpected error {err:?}"
    );
}

#[tokio::test]
async fn per_call_context_overrides_client_timeout() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        json!({"id": 3, "name": "Slow"}),
    )
    .with_delay(Duration::from_millis(100))])
    .await;
    let client = RestClient::builder()
        .base_url(&server.base_url)
        .timeout(Duration::from_millis(10))
        .build()
        .expect("client must build");
    let ctx = RequestContext::with_timeout(Duration::from_secs(5));
    let mut headers = HeaderMap::new();
    headers.insert("x-request-id", "req-1".parse().expect("valid header value"));

    let item = client
        .get::<Json<Item>>(Some(&ctx), "/items/3", Some(&headers))
        .await
        .expect("explicit context must allow the slow response")
        .into_json();

    assert_eq!(item.id, 3);
    assert_eq!(server.received()[0].headers["x-request-id"], "req-1");
}

#[tokio::test]
async fn absolute_url_bypasses_base_url() {
    let server = spawn_server(vec![MockResponse::text(StatusCode::OK, "pong")]).await;
    let client = RestClient::builder()
        .base_url("https://unreachable.invalid/api/")
        .build()
        .expect("client must build");

    let reply = client
        .get::<String>(None, &format!("{}/ping", server.base_url), None)
        .await
        .expect("absolute url must be used as-is");

    assert_eq!(reply.output, "pong");
    assert_eq!(server.received()[0].path, "/ping");
    assert!(reply
        .response
        .meta
        .url
        .as_ref()
        .is_some_and(|url| url.path() == "/ping"));
}
