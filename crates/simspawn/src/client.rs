//! Model lifecycle client
//!
//! Spawns and deletes named models through any [`ModelService`]. Every
//! outcome is logged and handed back to the caller; whether a failure aborts
//! the program or is merely noted is the caller's decision.

use chrono::{DateTime, Utc};
use simspawn_core::{
    DEFAULT_REFERENCE_FRAME, DeleteRequest, ModelDescription, ModelName, ModelService, Pose,
    Position, Result, SpawnRequest,
};
use tracing::{error, info};

/// A model the simulator accepted
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedModel {
    pub name: ModelName,
    pub pose: Pose,
    pub reference_frame: String,
    /// Status text returned by the simulator
    pub status_message: String,
    pub spawned_at: DateTime<Utc>,
}

/// Issues spawn and delete calls against a simulator
pub struct ModelLifecycleClient<S> {
    service: S,
    reference_frame: String,
    robot_namespace: String,
}

impl<S: ModelService> ModelLifecycleClient<S> {
    /// Create a client placing models in the `world` frame
    pub fn new(service: S) -> Self {
        Self {
            service,
            reference_frame: DEFAULT_REFERENCE_FRAME.to_string(),
            robot_namespace: String::new(),
        }
    }

    /// Set the frame spawn poses are expressed in
    pub fn with_reference_frame(mut self, frame: impl Into<String>) -> Self {
        self.reference_frame = frame.into();
        self
    }

    /// Set the robot namespace passed with every spawn
    pub fn with_robot_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.robot_namespace = namespace.into();
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Consume the client, returning the underlying service
    pub fn into_service(self) -> S {
        self.service
    }

    /// Spawn `description` as `name` at `position` with identity orientation.
    ///
    /// Issues exactly one remote call. Failures are logged and returned;
    /// nothing is retried.
    pub async fn spawn(
        &self,
        name: &str,
        description: &ModelDescription,
        position: Position,
    ) -> Result<SpawnedModel> {
        let name = ModelName::new(name)?;
        let request = SpawnRequest::new(name, description.clone(), Pose::at(position))
            .with_reference_frame(self.reference_frame.clone())
            .with_robot_namespace(self.robot_namespace.clone());

        self.spawn_request(request).await
    }

    /// Spawn a fully built request
    pub async fn spawn_request(&self, request: SpawnRequest) -> Result<SpawnedModel> {
        let service = self.service.spawn_service_name(&request);

        let outcome = self
            .service
            .spawn_model(&request)
            .await
            .and_then(|reply| reply.into_result(&service));

        match outcome {
            Ok(reply) => {
                info!(
                    model = %request.name(),
                    frame = %request.reference_frame(),
                    x = request.pose().position().x(),
                    y = request.pose().position().y(),
                    z = request.pose().position().z(),
                    "Spawned model {} in simulator",
                    request.name()
                );

                Ok(SpawnedModel {
                    name: request.name().clone(),
                    pose: *request.pose(),
                    reference_frame: request.reference_frame().to_string(),
                    status_message: reply.status_message,
                    spawned_at: Utc::now(),
                })
            }
            Err(e) => {
                error!(model = %request.name(), error = %e, "Spawn failed");
                Err(e)
            }
        }
    }

    /// Delete the model called `name`.
    ///
    /// Issues exactly one remote call carrying only the name.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let request = DeleteRequest::new(ModelName::new(name)?);
        let service = self.service.delete_service_name();

        let outcome = self
            .service
            .delete_model(&request)
            .await
            .and_then(|reply| reply.into_result(&service))
            .map(|_| ());

        match &outcome {
            Ok(()) => info!(
                model = %request.name(),
                "Deleted model {} from simulator",
                request.name()
            ),
            Err(e) => error!(model = %request.name(), error = %e, "Delete failed"),
        }

        outcome
    }
}
