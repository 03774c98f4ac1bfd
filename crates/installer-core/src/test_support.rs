//! Local HTTP server for exercising the network paths in tests

use crate::downloader::Downloader;
use axum::{
    body::Body,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, Method, Response, StatusCode, Uri},
    serve, Router,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// User agent sent by [`TestServer::downloader`]
pub const TEST_USER_AGENT: &str = "installer-tests";

/// A request as seen by the server
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Canned response
pub struct Reply {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
    delay: Option<Duration>,
}

impl Reply {
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: "application/octet-stream",
            body,
            delay: None,
        }
    }

    pub fn json(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: body.as_bytes().to_vec(),
            delay: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: Vec::new(),
            delay: None,
        }
    }

    /// Hold the response back for `delay`
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

type Route = dyn Fn(&str, &str) -> Reply + Send + Sync;

#[derive(Clone)]
struct ServerState {
    route: Arc<Route>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

pub struct TestServer {
    base: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl TestServer {
    /// Bind to an ephemeral port and answer every request with `route`
    pub async fn start<F>(route: F) -> Self
    where
        F: Fn(&str, &str) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let state = ServerState {
            route: Arc::new(route),
            requests: requests.clone(),
        };
        let router = Router::new().fallback(respond).with_state(state);

        let server = serve(listener, router);
        tokio::spawn(async move {
            let _ = server.await;
        });

        Self {
            base: format!("http://{addr}"),
            requests,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Production downloader settings, minus proxies from the environment
    pub fn downloader() -> Downloader {
        Downloader::builder(TEST_USER_AGENT).no_proxy(true).build()
    }
}

async fn respond(
    State(state): State<ServerState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response<Body> {
    let path = uri
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let reply = (state.route)(method.as_str(), &path);
    state.requests.lock().unwrap().push(Recorded {
        method: method.to_string(),
        path,
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect(),
    });

    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }

    Response::builder()
        .status(StatusCode::from_u16(reply.status).unwrap())
        .header(CONTENT_TYPE, reply.content_type)
        .body(Body::from(reply.body))
        .unwrap()
}
