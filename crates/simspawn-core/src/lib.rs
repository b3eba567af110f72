//! simspawn core - shared types and traits
//!
//! This crate defines the abstractions used by the `simspawn` client and CLI:
//! - Model placement records (`SpawnRequest`, `DeleteRequest`, `Pose`)
//! - The `ModelService` trait (interface to the simulator's remote services)
//! - Error types

pub mod error;
pub mod traits;
pub mod types;

pub use error::*;
pub use traits::*;
pub use types::*;
