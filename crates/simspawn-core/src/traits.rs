//! Core traits for simspawn
//!
//! `ModelService` is the remote interface of the simulator. The lifecycle
//! client works through this trait only, so the same client drives a live
//! rosbridge session or an in-memory stand-in.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DeleteRequest, ServiceReply, SpawnRequest};

/// Remote model services exposed by a simulator.
///
/// `Err` means the call itself failed (unreachable endpoint, transport
/// fault, bridge-level rejection). A reply with `success == false` means the
/// simulator handled the call and refused it.
#[async_trait]
pub trait ModelService: Send + Sync {
    /// Place a model in the simulated world
    async fn spawn_model(&self, request: &SpawnRequest) -> Result<ServiceReply>;

    /// Remove a model by name
    async fn delete_model(&self, request: &DeleteRequest) -> Result<ServiceReply>;

    /// Service name used for a spawn request, for error reporting
    fn spawn_service_name(&self, request: &SpawnRequest) -> String;

    /// Service name used for deletes, for error reporting
    fn delete_service_name(&self) -> String;
}
