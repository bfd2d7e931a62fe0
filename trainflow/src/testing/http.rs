//! In-process HTTP object server.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Default)]
struct ObjectState {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    requests: Arc<AtomicUsize>,
}

impl ObjectState {
    fn count(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// Serves `GET` and stores `PUT` bodies by decoded request path.
///
/// Unknown paths answer 404.
#[derive(Debug)]
pub struct StaticHttpServer {
    base_url: String,
    state: ObjectState,
    task: JoinHandle<()>,
}

impl StaticHttpServer {
    /// Binds an ephemeral local port and starts serving.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let addr = listener.local_addr().expect("local addr");
        let state = ObjectState::default();

        let app = Router::new()
            .route("/{*path}", get(get_object).put(put_object))
            .with_state(state.clone());

        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("test object server exited: {e:#}");
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            task,
        }
    }

    /// Returns `http://127.0.0.1:<port>`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Makes `path` answer `GET` with `body`.
    pub fn insert(&self, path: &str, body: Vec<u8>) {
        self.state.objects.lock().insert(path.to_string(), body);
    }

    /// Returns what is stored at `path`.
    #[must_use]
    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.state.objects.lock().get(path).cloned()
    }

    /// Returns the number of object requests handled so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }
}

impl Drop for StaticHttpServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn get_object(State(state): State<ObjectState>, Path(path): Path<String>) -> Response {
    state.count();
    let object = state.objects.lock().get(&format!("/{path}")).cloned();
    match object {
        Some(body) => (StatusCode::OK, body).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn put_object(
    State(state): State<ObjectState>,
    Path(path): Path<String>,
    body: Bytes,
) -> StatusCode {
    state.count();
    state.objects.lock().insert(format!("/{path}"), body.to_vec());
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_chunked_put_stores_full_body() {
        let server = StaticHttpServer::start().await;
        let addr = server.base_url().trim_start_matches("http://").to_string();
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();

        stream
            .write_all(
                b"PUT /models/best.pt HTTP/1.1\r\n\
                  Host: localhost\r\n\
                  Transfer-Encoding: chunked\r\n\
                  Connection: close\r\n\r\n\
                  5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n",
            )
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert_eq!(server.object("/models/best.pt"), Some(b"hello world".to_vec()));
        assert_eq!(server.request_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_object_is_404() {
        let server = StaticHttpServer::start().await;
        let response = reqwest::get(format!("{}/models/missing.pt", server.base_url()))
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    }
}
