//! # Bounded Connection Pool
//!
//! `size` permits guard checkout. A checked-out connection is wrapped in a
//! `PooledConnection`; dropping the guard returns the connection to the idle
//! list and then releases the permit, on every exit path.

use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use shared_types::{PoolStats, ResponseTimeStats};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::{PoolConfig, ResponseSamples, TelemetryCacheError};
use crate::ports::ConnectionFactory;

/// A checked-out connection.
pub struct PooledConnection<C> {
    conn: Arc<C>,
    idle: Arc<Mutex<Vec<Arc<C>>>>,
    _permit: OwnedSemaphorePermit,
}

impl<C> PooledConnection<C> {
    /// Shared handle for use inside an `async move` block.
    pub fn handle(&self) -> Arc<C> {
        Arc::clone(&self.conn)
    }
}

impl<C> Deref for PooledConnection<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.conn
    }
}

impl<C> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        self.idle.lock().push(Arc::clone(&self.conn));
    }
}

/// Bounded pool of `Arc<C>` connections.
pub struct ConnectionPool<C> {
    factory: Arc<dyn ConnectionFactory<C>>,
    semaphore: Arc<Semaphore>,
    idle: Arc<Mutex<Vec<Arc<C>>>>,
    samples: Mutex<ResponseSamples>,
    size: usize,
    acquire_timeout: Duration,
}

impl<C: Send + Sync + 'static> ConnectionPool<C> {
    pub fn new(
        config: &PoolConfig,
        sample_capacity: usize,
        factory: Arc<dyn ConnectionFactory<C>>,
    ) -> Self {
        let size = config.size.max(1);
        Self {
            factory,
            semaphore: Arc::new(Semaphore::new(size)),
            idle: Arc::new(Mutex::new(Vec::with_capacity(size))),
            samples: Mutex::new(ResponseSamples::new(sample_capacity)),
            size,
            acquire_timeout: Duration::from_millis(config.acquire_timeout_ms),
        }
    }

    /// Checks out a connection, opening a new one when none is idle.
    ///
    /// # Errors
    /// - `PoolExhausted`: no permit within the acquire timeout
    /// - `Connection`: the factory failed; the permit is released
    pub async fn acquire(&self) -> Result<PooledConnection<C>, TelemetryCacheError> {
        let permit = tokio::time::timeout(
            self.acquire_timeout,
            Arc::clone(&self.semaphore).acquire_owned(),
        )
        .await
        .map_err(|_| {
            warn!(size = self.size, "[pk-04] Connection pool exhausted");
            TelemetryCacheError::PoolExhausted {
                timeout_ms: self.acquire_timeout.as_millis() as u64,
            }
        })?
        .map_err(|_| TelemetryCacheError::PoolClosed)?;

        let reused = self.idle.lock().pop();
        let conn = match reused {
            Some(conn) => conn,
            None => {
                debug!("[pk-04] Opening pooled connection");
                Arc::new(self.factory.connect().await?)
            }
        };

        Ok(PooledConnection {
            conn,
            idle: Arc::clone(&self.idle),
            _permit: permit,
        })
    }

    /// Runs `op` with a checked-out connection and records its response
    /// time. The connection is released however `op` ends.
    pub async fn with_connection<T, F, Fut>(&self, op: F) -> Result<T, TelemetryCacheError>
    where
        F: FnOnce(Arc<C>) -> Fut,
        Fut: Future<Output = T>,
    {
        let started = Instant::now();
        let guard = self.acquire().await?;
        let result = op(guard.handle()).await;
        drop(guard);
        self.samples
            .lock()
            .record(started.elapsed().as_secs_f64() * 1000.0);
        Ok(result)
    }

    pub fn stats(&self) -> PoolStats {
        let in_use = self.size - self.semaphore.available_permits();
        PoolStats {
            size: self.size,
            in_use,
            idle: self.idle.lock().len(),
        }
    }

    pub fn response_times(&self) -> ResponseTimeStats {
        self.samples.lock().stats()
    }

    /// Rejects all future checkouts.
    pub fn close(&self) {
        self.semaphore.close();
    }
}
