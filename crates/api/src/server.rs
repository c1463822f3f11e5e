//! Server lifecycle: bind, serve in the background, stop on request.

use std::net::SocketAddr;

use anyhow::Context;
use axum::Router;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use gatehouse_infra::AppConfig;

use crate::app;

pub struct Server;

impl Server {
    /// Build stores and services from `config`, bind, and start serving.
    pub async fn start(config: &AppConfig) -> anyhow::Result<RunningServer> {
        let app = app::build_app(config).await?;
        Self::serve(app, config.bind_addr).await
    }

    /// Serve an already-built router.
    pub async fn serve(app: Router, bind_addr: SocketAddr) -> anyhow::Result<RunningServer> {
        let listener = tokio::net::TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("failed to bind {bind_addr}"))?;
        let local_addr = listener.local_addr().context("failed to read bound address")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tracing::info!(%local_addr, "listening");
        Ok(RunningServer {
            local_addr,
            shutdown: Some(shutdown_tx),
            handle,
        })
    }
}

/// Handle to a serving instance. Dropping it without [`stop`](Self::stop)
/// leaves the server running until the runtime shuts down.
pub struct RunningServer {
    pub local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Stop accepting connections, drain in-flight requests and wait.
    pub async fn stop(mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.context("server task panicked")??;
        tracing::info!(local_addr = %self.local_addr, "server stopped");
        Ok(())
    }
}
