//! Adapters implementing Report Aggregator outbound ports.

pub mod memory;
pub mod text;

pub use memory::InMemoryDataSource;
pub use text::TextRenderer;
