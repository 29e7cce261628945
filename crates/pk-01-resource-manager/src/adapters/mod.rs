//! Adapters implementing Resource Manager outbound ports.

pub mod memory;

pub use memory::InMemorySpaceRepository;
