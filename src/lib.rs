/// Public library interface for the habit tracker server
///
/// This module exports the server, its configuration and the layers it is
/// built from so that the binary and the integration tests can use them.

use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

pub mod actions;
pub mod config;
pub mod domain;
pub mod http;
pub mod storage;

// Re-export public modules and types
pub use actions::ActionError;
pub use config::{ServerConfig, StoreLocation};
pub use domain::*;
pub use http::{AppState, Clock, ImageStore};
pub use storage::{DocumentStore, MemoryStore, SqliteStore, StorageError, StoreHandle};

/// Errors that can occur during server startup or operation
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Database error: {0}")]
    Database(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Habit tracker HTTP server
///
/// Owns the store handle and image store, and serves the REST API until
/// shutdown is requested.
pub struct HabitTrackerServer {
    config: ServerConfig,
    store: StoreHandle,
    images: ImageStore,
    clock: Clock,
}

impl HabitTrackerServer {
    /// Create a server from its configuration
    ///
    /// Opens (and migrates) the database and creates the upload directory
    /// if they don't already exist.
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let store = match &config.store {
            StoreLocation::Sqlite(path) => {
                info!("Initializing habit store with database: {}", path.display());
                StoreHandle::new(SqliteStore::new(path.clone())?)
            }
            StoreLocation::Memory => {
                info!("Initializing in-memory habit store");
                StoreHandle::new(MemoryStore::new())
            }
        };

        Self::with_store(config, store).await
    }

    /// Create a server around an existing store
    pub async fn with_store(config: ServerConfig, store: StoreHandle) -> Result<Self, ServerError> {
        let images = ImageStore::new(config.uploads_dir.clone(), &config.public_url);
        images.prepare().await?;
        info!("Serving uploads from {}", images.dir().display());

        Ok(Self {
            config,
            store,
            images,
            clock: chrono::Utc::now,
        })
    }

    /// Use a different source of the current time for dates and timestamps
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// The application router, with state attached
    pub fn router(&self) -> Router {
        let state = AppState::new(self.store.clone(), self.images.clone()).with_clock(self.clock);
        http::router(Arc::new(state))
    }

    /// Bind the configured address and serve until Ctrl+C or SIGTERM
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
