//! rosbridge session
//!
//! Attaches to a running `rosbridge_server` over WebSocket and forwards
//! Gazebo service calls through it, using the rosbridge v2 JSON protocol:
//!
//! ```json
//! {"op": "call_service", "id": "drone_flight_simulator:<session>:0",
//!  "service": "/gazebo/spawn_urdf_model", "args": {"model_name": "test_drone", ...}}
//! ```
//!
//! answered by
//!
//! ```json
//! {"op": "service_response", "id": "...", "result": true,
//!  "values": {"success": true, "status_message": "..."}}
//! ```
//!
//! ## Lifecycle
//!
//! [`BridgeSession::connect`] is the attach step and [`BridgeSession::close`]
//! the teardown. A session dropped without `close` still tears the socket
//! down, and says so in the log.

use crate::config::BridgeConfig;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use simspawn_core::{
    DeleteRequest, ModelName, ModelService, Pose, ServiceReply, SimError, SpawnRequest,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use uuid::Uuid;

type BridgeSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Outgoing `call_service` operation
#[derive(Debug, Serialize)]
struct CallService<'a> {
    op: &'static str,
    id: &'a str,
    service: &'a str,
    args: Value,
}

/// `gazebo_msgs/SpawnModel` request body
#[derive(Debug, Serialize)]
struct SpawnModelArgs<'a> {
    model_name: &'a ModelName,
    model_xml: &'a str,
    robot_namespace: &'a str,
    initial_pose: &'a Pose,
    reference_frame: &'a str,
}

/// Any incoming operation; only the fields we act on
#[derive(Debug, Deserialize)]
struct Incoming {
    op: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    result: Option<bool>,
    #[serde(default)]
    values: Value,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

/// Interpret one incoming frame while waiting for the reply to `id`.
///
/// `Ok(None)` means the frame belongs to something else and should be skipped.
fn parse_service_response(
    service: &str,
    id: &str,
    text: &str,
) -> simspawn_core::Result<Option<Value>> {
    let incoming: Incoming = serde_json::from_str(text)
        .map_err(|e| SimError::protocol(format!("malformed bridge message: {}", e)))?;

    if incoming.id.as_deref() != Some(id) {
        debug!(op = %incoming.op, id = ?incoming.id, "Skipping unrelated bridge message");
        return Ok(None);
    }

    match incoming.op.as_str() {
        "service_response" => {
            if incoming.result == Some(false) {
                let message = match incoming.values {
                    Value::String(s) => s,
                    Value::Null => "service call failed".to_string(),
                    other => other.to_string(),
                };
                return Err(SimError::service(service, message));
            }
            Ok(Some(incoming.values))
        }
        "status" if incoming.level.as_deref() == Some("error") => Err(SimError::service(
            service,
            incoming.msg.unwrap_or_else(|| "bridge reported an error".to_string()),
        )),
        op => {
            debug!(op = %op, "Ignoring non-response message for pending call");
            Ok(None)
        }
    }
}

/// Live connection to a rosbridge server
pub struct BridgeSession {
    config: BridgeConfig,
    session_id: Uuid,
    next_call: AtomicU64,
    socket: Mutex<Option<BridgeSocket>>,
}

impl BridgeSession {
    /// Attach to the bridge named in `config`
    pub async fn connect(config: BridgeConfig) -> crate::error::Result<Self> {
        config.validate()?;

        let timeout = config.call_timeout();
        info!(url = %config.url, node = %config.node_name, "Attaching to rosbridge");

        let (socket, _response) =
            tokio::time::timeout(timeout, connect_async(config.url.as_str()))
                .await
                .map_err(|_| SimError::Timeout(timeout))??;

        let session_id = Uuid::new_v4();
        info!(
            node = %config.node_name,
            session = %session_id,
            "Attached to rosbridge"
        );

        Ok(Self {
            config,
            session_id,
            next_call: AtomicU64::new(0),
            socket: Mutex::new(Some(socket)),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Call a ROS service through the bridge and return its response values
    pub async fn call_service(&self, service: &str, args: Value) -> simspawn_core::Result<Value> {
        let seq = self.next_call.fetch_add(1, Ordering::Relaxed);
        let id = format!("{}:{}:{}", self.config.node_name, self.session_id, seq);

        let text = serde_json::to_string(&CallService {
            op: "call_service",
            id: &id,
            service,
            args,
        })
        .map_err(|e| SimError::protocol(e.to_string()))?;

        let timeout = self.config.call_timeout();
        tokio::time::timeout(timeout, self.exchange(service, &id, text))
            .await
            .map_err(|_| SimError::Timeout(timeout))?
    }

    async fn exchange(
        &self,
        service: &str,
        id: &str,
        text: String,
    ) -> simspawn_core::Result<Value> {
        let mut guard = self.socket.lock().await;
        let socket = guard
            .as_mut()
            .ok_or_else(|| SimError::transport("session is closed"))?;

        debug!(service = %service, id = %id, "Calling service");
        socket
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| SimError::transport(e.to_string()))?;

        loop {
            let frame = socket
                .next()
                .await
                .ok_or_else(|| SimError::transport("bridge closed the connection"))?
                .map_err(|e| SimError::transport(e.to_string()))?;

            match frame {
                Message::Text(text) => {
                    if let Some(values) = parse_service_response(service, id, text.as_str())? {
                        return Ok(values);
                    }
                }
                Message::Close(_) => {
                    guard.take();
                    warn!(session = %self.session_id, "rosbridge closed the session");
                    return Err(SimError::transport("bridge closed the connection"));
                }
                _ => {}
            }
        }
    }

    /// Leave the bridge, closing the WebSocket cleanly
    pub async fn close(mut self) -> crate::error::Result<()> {
        if let Some(mut socket) = self.socket.get_mut().take() {
            socket.close(None).await?;
            info!(session = %self.session_id, "Detached from rosbridge");
        }
        Ok(())
    }
}

impl Drop for BridgeSession {
    fn drop(&mut self) {
        if self.socket.get_mut().is_some() {
            warn!(
                session = %self.session_id,
                "rosbridge session dropped without close; tearing down socket"
            );
        }
    }
}

#[async_trait]
impl ModelService for BridgeSession {
    async fn spawn_model(&self, request: &SpawnRequest) -> simspawn_core::Result<ServiceReply> {
        let service = self.spawn_service_name(request);
        let args = serde_json::to_value(SpawnModelArgs {
            model_name: request.name(),
            model_xml: request.description().xml(),
            robot_namespace: request.robot_namespace(),
            initial_pose: request.pose(),
            reference_frame: request.reference_frame(),
        })
        .map_err(|e| SimError::protocol(e.to_string()))?;

        let values = self.call_service(&service, args).await?;
        serde_json::from_value(values).map_err(|e| SimError::protocol(e.to_string()))
    }

    async fn delete_model(&self, request: &DeleteRequest) -> simspawn_core::Result<ServiceReply> {
        let service = self.delete_service_name();
        let args = serde_json::to_value(request).map_err(|e| SimError::protocol(e.to_string()))?;

        let values = self.call_service(&service, args).await?;
        serde_json::from_value(values).map_err(|e| SimError::protocol(e.to_string()))
    }

    fn spawn_service_name(&self, request: &SpawnRequest) -> String {
        self.config
            .spawn_service(request.description().format())
            .to_string()
    }

    fn delete_service_name(&self) -> String {
        self.config.delete_service.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use simspawn_core::{DescriptionFormat, ModelDescription, Position};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const ID: &str = "drone_flight_simulator:s:0";

    /// Accept one client and answer each `call_service` with `handler`'s frames.
    /// Resolves to every request received once the client leaves.
    async fn fake_bridge<F>(handler: F) -> (String, JoinHandle<Vec<Value>>)
    where
        F: Fn(&Value) -> Vec<Message> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let mut seen = Vec::new();

            while let Some(Ok(frame)) = ws.next().await {
                match frame {
                    Message::Text(text) => {
                        let request: Value = serde_json::from_str(text.as_str()).unwrap();
                        for reply in handler(&request) {
                            ws.send(reply).await.unwrap();
                        }
                        seen.push(request);
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            seen
        });

        (format!("ws://{}", addr), handle)
    }

    fn text(value: Value) -> Message {
        Message::Text(value.to_string().into())
    }

    fn response(id: &str, success: bool, status_message: &str) -> Message {
        text(json!({
            "op": "service_response",
            "id": id,
            "result": true,
            "values": {"success": success, "status_message": status_message}
        }))
    }

    fn gazebo_ok(request: &Value) -> Vec<Message> {
        vec![
            text(json!({"op": "publish", "topic": "/clock", "msg": {"clock": {"secs": 1}}})),
            response(request["id"].as_str().unwrap(), true, "ok"),
        ]
    }

    fn delete(name: &str) -> DeleteRequest {
        DeleteRequest::new(ModelName::new(name).unwrap())
    }

    fn spawn_request(format: DescriptionFormat) -> SpawnRequest {
        SpawnRequest::new(
            ModelName::new("test_drone").unwrap(),
            ModelDescription::new(format, "<robot name=\"drone\"/>"),
            Pose::at(Position::new(0.0, 0.0, 1.0).unwrap()),
        )
    }

    #[test]
    fn test_parse_successful_response() {
        let text = json!({
            "op": "service_response", "id": ID, "result": true,
            "values": {"success": true, "status_message": "SpawnModel: Successfully spawned entity"}
        })
        .to_string();

        let values = parse_service_response("/gazebo/spawn_urdf_model", ID, &text)
            .unwrap()
            .unwrap();
        let reply: ServiceReply = serde_json::from_value(values).unwrap();
        assert!(reply.success);
    }

    #[test]
    fn test_parse_skips_other_ids_and_ops() {
        let other_id = json!({"op": "service_response", "id": "x", "result": true, "values": {}});
        let publish = json!({"op": "publish", "topic": "/clock", "msg": {}});

        assert_eq!(
            parse_service_response("/s", ID, &other_id.to_string()),
            Ok(None)
        );
        assert_eq!(
            parse_service_response("/s", ID, &publish.to_string()),
            Ok(None)
        );
    }

    #[test]
    fn test_parse_failed_call() {
        let text = json!({
            "op": "service_response", "id": ID, "result": false,
            "values": "Service /gazebo/spawn_urdf_model does not exist"
        })
        .to_string();

        assert_eq!(
            parse_service_response("/gazebo/spawn_urdf_model", ID, &text),
            Err(SimError::service(
                "/gazebo/spawn_urdf_model",
                "Service /gazebo/spawn_urdf_model does not exist"
            ))
        );
    }

    #[test]
    fn test_parse_error_status() {
        let text = json!({"op": "status", "id": ID, "level": "error", "msg": "unknown service"})
            .to_string();
        let err = parse_service_response("/s", ID, &text).unwrap_err();
        assert_eq!(err, SimError::service("/s", "unknown service"));
    }

    #[test]
    fn test_parse_garbage_is_protocol_error() {
        let err = parse_service_response("/s", ID, "not json").unwrap_err();
        assert!(matches!(err, SimError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_spawn_and_delete_through_bridge() {
        let (url, server) = fake_bridge(gazebo_ok).await;
        let session = BridgeSession::connect(BridgeConfig::new(url)).await.unwrap();

        let reply = session
            .spawn_model(&spawn_request(DescriptionFormat::Urdf))
            .await
            .unwrap();
        assert!(reply.success);

        let reply = session
            .delete_model(&delete("test_drone"))
            .await
            .unwrap();
        assert!(reply.success);

        session.close().await.unwrap();
        let seen = server.await.unwrap();

        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0]["op"], "call_service");
        assert_eq!(seen[0]["service"], "/gazebo/spawn_urdf_model");
        assert!(seen[0]["id"].as_str().unwrap().starts_with("drone_flight_simulator:"));
        assert_eq!(seen[0]["args"]["model_name"], "test_drone");
        assert_eq!(seen[0]["args"]["robot_namespace"], "");
        assert_eq!(seen[0]["args"]["reference_frame"], "world");
        assert_eq!(seen[0]["args"]["initial_pose"]["position"]["z"], 1.0);
        assert_eq!(seen[0]["args"]["initial_pose"]["orientation"]["w"], 1.0);

        assert_eq!(seen[1]["service"], "/gazebo/delete_model");
        assert_eq!(seen[1]["args"], json!({"model_name": "test_drone"}));
        assert_ne!(seen[0]["id"], seen[1]["id"]);
    }

    #[tokio::test]
    async fn test_sdf_uses_sdf_service() {
        let (url, server) = fake_bridge(gazebo_ok).await;
        let session = BridgeSession::connect(BridgeConfig::new(url)).await.unwrap();

        session
            .spawn_model(&spawn_request(DescriptionFormat::Sdf))
            .await
            .unwrap();
        session.close().await.unwrap();

        let seen = server.await.unwrap();
        assert_eq!(seen[0]["service"], "/gazebo/spawn_sdf_model");
    }

    #[tokio::test]
    async fn test_bridge_failure_surfaces_as_service_error() {
        let (url, server) = fake_bridge(|request| {
            vec![text(json!({
                "op": "service_response",
                "id": request["id"],
                "result": false,
                "values": "Service /gazebo/delete_model does not exist"
            }))]
        })
        .await;
        let session = BridgeSession::connect(BridgeConfig::new(url)).await.unwrap();

        let err = session
            .delete_model(&delete("test_drone"))
            .await
            .unwrap_err();
        assert!(matches!(err, SimError::Service { .. }));

        session.close().await.unwrap();
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_silent_bridge_times_out() {
        let (url, _server) = fake_bridge(|_| Vec::new()).await;
        let config = BridgeConfig::new(url).with_call_timeout(Duration::from_secs(1));
        let session = BridgeSession::connect(config).await.unwrap();

        let err = session
            .delete_model(&delete("test_drone"))
            .await
            .unwrap_err();
        assert_eq!(err, SimError::Timeout(Duration::from_secs(1)));

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_frame_mid_call_is_transport_error() {
        let (url, _server) = fake_bridge(|_| vec![Message::Close(None)]).await;
        let session = BridgeSession::connect(BridgeConfig::new(url)).await.unwrap();

        let err = session.delete_model(&delete("test_drone")).await.unwrap_err();
        assert_eq!(err, SimError::transport("bridge closed the connection"));

        let err = session.delete_model(&delete("test_drone")).await.unwrap_err();
        assert_eq!(err, SimError::transport("session is closed"));

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_late_reply_is_skipped_by_id() {
        let (url, server) = fake_bridge(|request| {
            let id = request["id"].as_str().unwrap();
            let (prefix, seq) = id.rsplit_once(':').unwrap();
            if seq == "0" {
                // first call gets no answer until the next one arrives
                return Vec::new();
            }
            vec![
                response(&format!("{}:0", prefix), false, "late"),
                response(id, true, "reply2"),
            ]
        })
        .await;
        let config = BridgeConfig::new(url).with_call_timeout(Duration::from_secs(1));
        let session = BridgeSession::connect(config).await.unwrap();

        let err = session.delete_model(&delete("first")).await.unwrap_err();
        assert_eq!(err, SimError::Timeout(Duration::from_secs(1)));

        let reply = session.delete_model(&delete("second")).await.unwrap();
        assert!(reply.success);
        assert_eq!(reply.status_message, "reply2");

        session.close().await.unwrap();
        assert_eq!(server.await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_url() {
        let err = BridgeSession::connect(BridgeConfig::new("localhost:9090"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, crate::error::SpawnerError::Config(_)));
    }
}
