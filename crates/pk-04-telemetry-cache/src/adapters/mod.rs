//! Adapters implementing Telemetry Cache outbound ports, plus the pool.

pub mod loopback;
pub mod pool;
pub mod probe;

pub use loopback::{LoopbackConnection, LoopbackFactory};
pub use pool::{ConnectionPool, PooledConnection};
pub use probe::{HostProbe, StaticProbe};
