//! Model placement records
//!
//! These mirror the `gazebo_msgs/SpawnModel` and `gazebo_msgs/DeleteModel`
//! request layouts. Every type validates on construction, so a value that
//! exists is always safe to put on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SimError};

/// Reference frame used when the caller does not pick one
pub const DEFAULT_REFERENCE_FRAME: &str = "world";

/// Name of a model instance in the simulator's namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelName(String);

impl ModelName {
    /// Create a model name, rejecting empty or whitespace-only input
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SimError::InvalidName(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ModelName {
    type Error = SimError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ModelName {
    type Error = SimError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ModelName> for String {
    fn from(name: ModelName) -> Self {
        name.0
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cartesian position (metres), always finite
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPosition")]
pub struct Position {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Deserialize)]
struct RawPosition {
    x: f64,
    y: f64,
    z: f64,
}

impl TryFrom<RawPosition> for Position {
    type Error = SimError;

    fn try_from(raw: RawPosition) -> Result<Self> {
        Self::new(raw.x, raw.y, raw.z)
    }
}

impl Position {
    /// The origin of the reference frame
    pub const ORIGIN: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Create a position, rejecting NaN and infinite coordinates
    pub fn new(x: f64, y: f64, z: f64) -> Result<Self> {
        for (axis, value) in [('x', x), ('y', y), ('z', z)] {
            if !value.is_finite() {
                return Err(SimError::NonFiniteCoordinate { axis, value });
            }
        }
        Ok(Self { x, y, z })
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn z(&self) -> f64 {
        self.z
    }
}

impl TryFrom<&[f64]> for Position {
    type Error = SimError;

    fn try_from(coords: &[f64]) -> Result<Self> {
        match *coords {
            [x, y, z] => Self::new(x, y, z),
            _ => Err(SimError::PositionArity(coords.len())),
        }
    }
}

impl TryFrom<[f64; 3]> for Position {
    type Error = SimError;

    fn try_from([x, y, z]: [f64; 3]) -> Result<Self> {
        Self::new(x, y, z)
    }
}

impl TryFrom<(f64, f64, f64)> for Position {
    type Error = SimError;

    fn try_from((x, y, z): (f64, f64, f64)) -> Result<Self> {
        Self::new(x, y, z)
    }
}

/// Unit quaternion orientation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Orientation {
    x: f64,
    y: f64,
    z: f64,
    w: f64,
}

impl Orientation {
    /// No rotation
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn w(&self) -> f64 {
        self.w
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Position plus orientation (`geometry_msgs/Pose`).
///
/// Orientation is always identity; deserializing any other rotation fails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPose")]
pub struct Pose {
    position: Position,
    orientation: Orientation,
}

#[derive(Deserialize)]
struct RawOrientation {
    x: f64,
    y: f64,
    z: f64,
    w: f64,
}

#[derive(Deserialize)]
struct RawPose {
    position: Position,
    #[serde(default)]
    orientation: Option<RawOrientation>,
}

impl TryFrom<RawPose> for Pose {
    type Error = SimError;

    fn try_from(raw: RawPose) -> Result<Self> {
        if let Some(q) = raw.orientation {
            let identity = Orientation::IDENTITY;
            if (q.x, q.y, q.z, q.w) != (identity.x, identity.y, identity.z, identity.w) {
                return Err(SimError::UnsupportedOrientation {
                    x: q.x,
                    y: q.y,
                    z: q.z,
                    w: q.w,
                });
            }
        }
        Ok(Self::at(raw.position))
    }
}

impl Pose {
    /// Pose at `position` with identity orientation
    pub fn at(position: Position) -> Self {
        Self {
            position,
            orientation: Orientation::IDENTITY,
        }
    }

    /// Build a pose from raw coordinates, checking arity and finiteness
    pub fn from_coordinates(coords: &[f64]) -> Result<Self> {
        Position::try_from(coords).map(Self::at)
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }
}

/// Robot description dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionFormat {
    /// Unified Robot Description Format (`<robot>` root)
    Urdf,
    /// Simulation Description Format (`<sdf>` root)
    Sdf,
}

impl DescriptionFormat {
    /// Classify an XML payload by its root element.
    ///
    /// XML declarations, comments and doctype nodes before the root are skipped.
    pub fn detect(xml: &str) -> Result<Self> {
        let mut rest = xml;
        while let Some(start) = rest.find('<') {
            let tag = &rest[start + 1..];

            if let Some(comment) = tag.strip_prefix("!--") {
                let end = comment
                    .find("-->")
                    .ok_or_else(|| SimError::UnknownDescription("unterminated comment".into()))?;
                rest = &comment[end + 3..];
                continue;
            }

            if tag.starts_with('?') || tag.starts_with('!') {
                let end = tag.find('>').ok_or_else(|| {
                    SimError::UnknownDescription("unterminated declaration".into())
                })?;
                rest = &tag[end + 1..];
                continue;
            }

            let root: String = tag
                .chars()
                .take_while(|c| !c.is_whitespace() && *c != '>' && *c != '/')
                .collect();

            return match root.as_str() {
                "robot" => Ok(Self::Urdf),
                "sdf" => Ok(Self::Sdf),
                other => Err(SimError::UnknownDescription(format!(
                    "root element <{}> is neither <robot> nor <sdf>",
                    other
                ))),
            };
        }

        Err(SimError::UnknownDescription("no root element found".into()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Urdf => "urdf",
            Self::Sdf => "sdf",
        }
    }
}

impl FromStr for DescriptionFormat {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "urdf" => Ok(Self::Urdf),
            "sdf" => Ok(Self::Sdf),
            other => Err(SimError::UnknownDescription(format!(
                "unknown format '{}' (expected urdf or sdf)",
                other
            ))),
        }
    }
}

impl fmt::Display for DescriptionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque robot description payload, passed through to the simulator untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescription {
    format: DescriptionFormat,
    xml: String,
}

impl ModelDescription {
    /// Wrap a payload whose format is already known
    pub fn new(format: DescriptionFormat, xml: impl Into<String>) -> Self {
        Self {
            format,
            xml: xml.into(),
        }
    }

    /// Wrap a payload, detecting its format from the root element
    pub fn detect(xml: impl Into<String>) -> Result<Self> {
        let xml = xml.into();
        let format = DescriptionFormat::detect(&xml)?;
        Ok(Self { format, xml })
    }

    pub fn format(&self) -> DescriptionFormat {
        self.format
    }

    pub fn xml(&self) -> &str {
        &self.xml
    }
}

/// Request to place a model in the simulator
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    name: ModelName,
    description: ModelDescription,
    robot_namespace: String,
    pose: Pose,
    reference_frame: String,
}

impl SpawnRequest {
    /// Spawn request in the `world` frame with an empty robot namespace
    pub fn new(name: ModelName, description: ModelDescription, pose: Pose) -> Self {
        Self {
            name,
            description,
            robot_namespace: String::new(),
            pose,
            reference_frame: DEFAULT_REFERENCE_FRAME.to_string(),
        }
    }

    /// Place the model relative to another frame
    pub fn with_reference_frame(mut self, frame: impl Into<String>) -> Self {
        self.reference_frame = frame.into();
        self
    }

    /// Set the ROS namespace the spawned model's plugins live under
    pub fn with_robot_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.robot_namespace = namespace.into();
        self
    }

    pub fn name(&self) -> &ModelName {
        &self.name
    }

    pub fn description(&self) -> &ModelDescription {
        &self.description
    }

    pub fn robot_namespace(&self) -> &str {
        &self.robot_namespace
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn reference_frame(&self) -> &str {
        &self.reference_frame
    }
}

/// Request to remove a model from the simulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteRequest {
    model_name: ModelName,
}

impl DeleteRequest {
    pub fn new(name: ModelName) -> Self {
        Self { model_name: name }
    }

    pub fn name(&self) -> &ModelName {
        &self.model_name
    }
}

/// Reply shared by the Gazebo spawn and delete services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceReply {
    pub success: bool,
    #[serde(default)]
    pub status_message: String,
}

impl ServiceReply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            status_message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            status_message: message.into(),
        }
    }

    /// Turn a `success: false` reply into a service error
    pub fn into_result(self, service: &str) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(SimError::service(service, self.status_message))
        }
    }
}
