//! Shared utilities for integration testing.

use std::net::SocketAddr;

use axum::Router;
use greenlight_gate::config::AppConfig;
use greenlight_gate::http::HttpServer;
use greenlight_gate::lifecycle::{ShutdownError, TerminationSignal};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A gateway running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    trigger: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), ShutdownError>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Deliver the termination signal.
    pub fn terminate(&mut self) {
        if let Some(tx) = self.trigger.take() {
            let _ = tx.send(());
        }
    }

    /// Terminate and wait for the orchestrator's verdict.
    pub async fn stop(mut self) -> Result<(), ShutdownError> {
        self.terminate();
        self.handle.await.expect("server task panicked")
    }
}

/// Start a gateway in front of `routes`.
pub async fn start_server(config: AppConfig, routes: Router) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (tx, rx) = oneshot::channel::<()>();
    let trigger = async move {
        let _ = rx.await;
        TerminationSignal::Terminate
    };

    let server = HttpServer::new(config, routes);
    let handle = tokio::spawn(server.run(listener, trigger));

    TestServer {
        addr,
        trigger: Some(tx),
        handle,
    }
}

/// Client that opens a fresh connection for every request.
pub fn fresh_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
