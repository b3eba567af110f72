//! In-memory simulator
//!
//! Implements [`ModelService`] without a simulator process. Tracks which
//! models are live and records every request, with Gazebo's reply semantics
//! for duplicate spawns and unknown deletes. Backs `--dry-run` and the tests.

use async_trait::async_trait;
use simspawn_core::{
    DeleteRequest, ModelName, ModelService, Pose, Result, ServiceReply, SimError, SpawnRequest,
};
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::debug;

const SPAWN_SERVICE: &str = "memory/spawn_model";
const DELETE_SERVICE: &str = "memory/delete_model";

/// A request as the simulator received it
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Spawn(SpawnRequest),
    Delete(DeleteRequest),
}

#[derive(Debug, Default)]
struct State {
    live: BTreeMap<ModelName, Pose>,
    calls: Vec<RecordedCall>,
    fail_next: Option<String>,
}

/// Simulator stand-in that lives entirely in this process
#[derive(Debug, Default)]
pub struct InMemorySimulator {
    state: Mutex<State>,
}

impl InMemorySimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call fail at the service level with `message`
    pub async fn fail_next_call(&self, message: impl Into<String>) {
        self.state.lock().await.fail_next = Some(message.into());
    }

    /// Names and poses of models currently in the world
    pub async fn live_models(&self) -> Vec<(ModelName, Pose)> {
        let state = self.state.lock().await;
        state
            .live
            .iter()
            .map(|(name, pose)| (name.clone(), *pose))
            .collect()
    }

    /// Every request received so far, in order
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().await.calls.clone()
    }
}

#[async_trait]
impl ModelService for InMemorySimulator {
    async fn spawn_model(&self, request: &SpawnRequest) -> Result<ServiceReply> {
        let mut state = self.state.lock().await;
        state.calls.push(RecordedCall::Spawn(request.clone()));

        if let Some(message) = state.fail_next.take() {
            return Err(SimError::service(SPAWN_SERVICE, message));
        }

        if state.live.contains_key(request.name()) {
            return Ok(ServiceReply::rejected(format!(
                "SpawnModel: Failure - entity [{}] already exists.",
                request.name()
            )));
        }

        state.live.insert(request.name().clone(), *request.pose());
        debug!(model = %request.name(), live = state.live.len(), "Model spawned in memory");

        Ok(ServiceReply::ok("SpawnModel: Successfully spawned entity"))
    }

    async fn delete_model(&self, request: &DeleteRequest) -> Result<ServiceReply> {
        let mut state = self.state.lock().await;
        state.calls.push(RecordedCall::Delete(request.clone()));

        if let Some(message) = state.fail_next.take() {
            return Err(SimError::service(DELETE_SERVICE, message));
        }

        if state.live.remove(request.name()).is_none() {
            return Ok(ServiceReply::rejected("DeleteModel: model does not exist"));
        }

        debug!(model = %request.name(), live = state.live.len(), "Model deleted in memory");

        Ok(ServiceReply::ok(format!(
            "DeleteModel: successfully deleted model [{}]",
            request.name()
        )))
    }

    fn spawn_service_name(&self, _request: &SpawnRequest) -> String {
        SPAWN_SERVICE.to_string()
    }

    fn delete_service_name(&self) -> String {
        DELETE_SERVICE.to_string()
    }
}
