use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use futures_util::stream;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Canned response served for one request path.
#[derive(Clone, Debug)]
pub struct Route {
    path: String,
    status: u16,
    body: Vec<u8>,
    declared_len: Option<usize>,
}

impl Route {
    pub fn new(path: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.to_owned(),
            status,
            body: body.into(),
            declared_len: None,
        }
    }

    /// Announce `declared_len` bytes, send the body, then abort the stream.
    pub fn truncated(path: &str, body: impl Into<Vec<u8>>, declared_len: usize) -> Self {
        Self {
            declared_len: Some(declared_len),
            ..Self::new(path, 200, body)
        }
    }

    fn respond(&self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let Some(declared) = self.declared_len else {
            return (status, self.body.clone()).into_response();
        };
        let chunks: Vec<Result<Vec<u8>, io::Error>> = vec![
            Ok(self.body.clone()),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "transfer cut short")),
        ];
        (
            status,
            [(header::CONTENT_LENGTH, declared.to_string())],
            Body::from_stream(stream::iter(chunks)),
        )
            .into_response()
    }
}

struct Shared {
    routes: Vec<Route>,
    hits: AtomicUsize,
}

async fn serve_route(State(shared): State<Arc<Shared>>, uri: Uri) -> Response {
    shared.hits.fetch_add(1, Ordering::SeqCst);
    match shared.routes.iter().find(|route| route.path == uri.path()) {
        Some(route) => route.respond(),
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

/// Loopback HTTP server answering canned routes, 404 for anything else.
pub struct TestServer {
    base: String,
    shared: Arc<Shared>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(routes: Vec<(&str, u16, Vec<u8>)>) -> Self {
        let routes = routes
            .into_iter()
            .map(|(path, status, body)| Route::new(path, status, body))
            .collect();
        Self::with_routes(routes).await
    }

    pub async fn with_routes(routes: Vec<Route>) -> Self {
        let shared = Arc::new(Shared {
            routes,
            hits: AtomicUsize::new(0),
        });
        let app = Router::new()
            .fallback(serve_route)
            .with_state(shared.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            base,
            shared,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Number of requests answered so far.
    pub fn hits(&self) -> usize {
        self.shared.hits.load(Ordering::SeqCst)
    }

    /// URL of a port nothing listens on.
    pub async fn closed_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
