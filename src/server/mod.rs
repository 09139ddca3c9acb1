//! Server mode: TCP listener, one handler task per connection.
//!
//! The accept loop and every connection loop run concurrently; a
//! connection-fatal error tears down its own task and nothing else. The
//! file registry is built once and shared, so the per-file locks arbitrate
//! between connections.

mod router;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::registry::FileRegistry;
use crate::transfer::{Error, Session};

pub struct Server {
    listener: TcpListener,
    registry: Arc<FileRegistry>,
}

impl Server {
    /// Binds the listener and scans the storage root into the registry.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let registry = FileRegistry::new(&config.root)
            .with_context(|| format!("failed to open storage root {}", config.root.display()))?;
        let listener = TcpListener::bind(&config.addr)
            .await
            .with_context(|| format!("failed to bind {}", config.addr))?;
        info!(addr = %config.addr, root = %config.root.display(), "server listening");
        Ok(Self {
            listener,
            registry: Arc::new(registry),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts until the listener fails or `shutdown` fires.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("server shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (conn, peer) = accepted.context("accept failed")?;
                    let registry = Arc::clone(&self.registry);
                    let shutdown = shutdown.clone();
                    tokio::spawn(handle_connection(conn, peer, registry, shutdown));
                }
            }
        }
    }
}

/// Binds and serves in one call.
pub async fn run(config: ServerConfig, shutdown: CancellationToken) -> Result<()> {
    Server::bind(config).await?.serve(shutdown).await
}

async fn handle_connection(
    conn: TcpStream,
    peer: SocketAddr,
    registry: Arc<FileRegistry>,
    shutdown: CancellationToken,
) {
    info!(%peer, "connection accepted");
    let mut session = Session::new(conn);
    loop {
        match router::route_request(&mut session, &registry, &shutdown).await {
            Ok(()) => {}
            Err(Error::Closed) => {
                info!(%peer, "connection closed by client");
                return;
            }
            Err(Error::Cancelled) => {
                info!(%peer, "connection cancelled");
                return;
            }
            Err(err) => {
                warn!(%peer, error = %err, "connection terminated");
                return;
            }
        }
    }
}
