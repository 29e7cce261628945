//! In-process connection type for the pool.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::domain::TelemetryCacheError;
use crate::ports::ConnectionFactory;

/// A connection that talks to nothing; carries an id so reuse is visible.
#[derive(Debug, PartialEq, Eq)]
pub struct LoopbackConnection {
    pub id: u64,
}

/// Hands out numbered `LoopbackConnection`s.
#[derive(Debug, Default)]
pub struct LoopbackFactory {
    opened: AtomicU64,
}

impl LoopbackFactory {
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ConnectionFactory<LoopbackConnection> for LoopbackFactory {
    async fn connect(&self) -> Result<LoopbackConnection, TelemetryCacheError> {
        let id = self.opened.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(LoopbackConnection { id })
    }
}
