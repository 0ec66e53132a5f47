//! Shared, async-friendly access to a document store
//!
//! The store is created once at startup and passed to every request handler
//! through the router state.

use std::sync::{Arc, Mutex};

use crate::storage::{DocumentStore, StorageError};

/// Cloneable handle to the process-wide document store
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<Mutex<Box<dyn DocumentStore + Send>>>,
}

impl StoreHandle {
    pub fn new<S>(store: S) -> Self
    where
        S: DocumentStore + Send + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Box::new(store))),
        }
    }

    /// Run a closure with access to the store on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&dyn DocumentStore) -> Result<R, E> + Send + 'static,
        R: Send + 'static,
        E: From<StorageError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let guard = inner
                .lock()
                .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
            let store: &dyn DocumentStore = &**guard;
            f(store)
        })
        .await
        .map_err(|e| E::from(StorageError::Task(e.to_string())))?
    }
}
