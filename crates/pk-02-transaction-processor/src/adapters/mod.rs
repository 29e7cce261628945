//! Adapters implementing Transaction Processor outbound ports.

pub mod gateway;

pub use gateway::SimulatedGateway;
