//! # Domain Layer - Resource Manager
//!
//! - `entities`: zone layout input, zone occupancy, gate state
//! - `transitions`: the space state machine as pure functions
//! - `errors`: `ResourceError`

pub mod entities;
pub mod errors;
pub mod transitions;

pub use entities::*;
pub use errors::*;
pub use transitions::*;
