//! # simspawn
//!
//! Spawn and delete robot models in a running Gazebo simulator.
//!
//! ## Architecture
//!
//! ```text
//! simspawn (Rust)                      ROS / Gazebo
//! ├── ModelLifecycleClient ──┐
//! │                          ├─ ModelService
//! ├── BridgeSession ─────────┘ ── WebSocket ──> rosbridge_server
//! └── InMemorySimulator (dry run)                 ├─> /gazebo/spawn_*_model
//!                                                 └─> /gazebo/delete_model
//! ```
//!
//! The client builds validated placement records and hands them to any
//! [`ModelService`](simspawn_core::ModelService). Failures come back as
//! `Result`s; the caller picks whether to abort or carry on.

#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod description;
pub mod error;
pub mod memory;
pub mod session;

// Lifecycle client
pub use client::{ModelLifecycleClient, SpawnedModel};

// Bridge session
pub use config::{BridgeConfig, DEFAULT_BRIDGE_URL, DEFAULT_NODE_NAME};
pub use session::BridgeSession;

// In-memory simulator
pub use memory::{InMemorySimulator, RecordedCall};

// Description loading
pub use description::load_description;

// Error handling
pub use error::{Result, SpawnerError};

pub use simspawn_core::{
    DescriptionFormat, ModelDescription, ModelName, ModelService, Pose, Position, SimError,
};
