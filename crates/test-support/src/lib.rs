use anyhow::Context as _;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::net::TcpListener;
use std::process::Child;
use std::sync::Arc;
use std::time::{Duration, Instant};
use unrelated_provider_http::{
    HttpTransport, ProviderHttpError, ProviderRequest, ProviderResponse, Result as HttpResult,
};

pub struct KillOnDrop(pub Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.kill();
    }
}

/// Pick an unused TCP port on localhost.
///
/// Note: this does not reserve the port; it's still possible for another process to bind it
/// before you do.
///
/// # Errors
///
/// Returns an error if binding an ephemeral localhost port fails or if the bound socket's
/// local address cannot be read.
pub fn pick_unused_port() -> anyhow::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("bind ephemeral port")?;
    Ok(listener.local_addr()?.port())
}

/// Poll an HTTP URL until it returns a success status (2xx/3xx).
///
/// # Errors
///
/// Returns an error if the timeout elapses before the endpoint returns a success status.
pub async fn wait_http_ok(url: &str, timeout_dur: Duration) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let start = Instant::now();
    loop {
        if start.elapsed() > timeout_dur {
            anyhow::bail!("timed out waiting for {url}");
        }

        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            _ => tokio::time::sleep(Duration::from_millis(200)).await,
        }
    }
}

/// A mock provider API served by axum on an ephemeral localhost port.
pub struct MockServer {
    pub base_url: String,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockServer {
    /// Serve `app` until the returned handle is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if no localhost port can be bound.
    pub async fn spawn(app: axum::Router) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind mock provider")?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        tokio::spawn(async move { server.await });
        Ok(Self {
            base_url: format!("http://{addr}"),
            shutdown: Some(shutdown_tx),
        })
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Response(ProviderResponse),
    TransportError(String),
}

#[derive(Debug)]
struct Route {
    method: Method,
    path: String,
    replies: VecDeque<Reply>,
}

/// No-network [`HttpTransport`] double.
///
/// Routes match on method + URL path. A route with several queued replies hands them out in
/// order and then keeps repeating the last one. Unmatched requests get a 404.
#[derive(Debug, Default, Clone)]
pub struct RecordingTransport {
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON reply for `method path`.
    #[must_use]
    pub fn on(self, method: Method, path: &str, status: u16, body: Value) -> Self {
        self.push(method, path, Reply::Response(ProviderResponse::new(status, body)));
        self
    }

    /// Queue a transport-level failure for `method path`.
    #[must_use]
    pub fn fail(self, method: Method, path: &str, message: &str) -> Self {
        self.push(method, path, Reply::TransportError(message.to_string()));
        self
    }

    fn push(&self, method: Method, path: &str, reply: Reply) {
        let mut routes = self.routes.lock();
        if let Some(route) = routes
            .iter_mut()
            .find(|r| r.method == method && r.path == path)
        {
            route.replies.push_back(reply);
        } else {
            routes.push(Route {
                method,
                path: path.to_string(),
                replies: VecDeque::from([reply]),
            });
        }
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    #[must_use]
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().clone()
    }

    /// Requests whose URL path equals `path`.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<ProviderRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.path() == path)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn send(&self, request: ProviderRequest) -> HttpResult<ProviderResponse> {
        let reply = {
            let mut routes = self.routes.lock();
            routes
                .iter_mut()
                .find(|r| r.method == request.method && r.path == request.url.path())
                .and_then(|route| {
                    if route.replies.len() > 1 {
                        route.replies.pop_front()
                    } else {
                        route.replies.front().cloned()
                    }
                })
        };
        self.requests.lock().push(request);

        match reply {
            Some(Reply::Response(resp)) => Ok(resp),
            Some(Reply::TransportError(msg)) => Err(ProviderHttpError::Transport(msg)),
            None => Ok(ProviderResponse::new(
                404,
                json!({ "error": { "message": "not found" } }),
            )),
        }
    }
}
