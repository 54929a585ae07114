//! Relay payloads.
//!
//! DESIGN
//! ======
//! The relay forwards producer payloads verbatim, so the wire value stays a
//! `serde_json::Value`. Classification only decides whether the payload is
//! something a viewer can act on: a depth measurement object, or a non-empty
//! array of camera poses. Typed views are borrowed out of the value on demand.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geo::{self, GeoError};

/// Event type tag for depth measurements.
pub const DEPTH_TYPE: &str = "depth";
/// Event type tag broadcast after a mask is persisted.
pub const MASK_SAVED_TYPE: &str = "mask-saved";
/// Event type tag for the per-connection greeting.
pub const HELLO_TYPE: &str = "hello";

// =============================================================================
// DEPTH
// =============================================================================

/// Flood depth measured at a building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthMessage {
    #[serde(rename = "type")]
    pub kind: String,
    /// Building location as `"lat,lng"`.
    pub location: String,
    /// Depth in metres. Producers sometimes send strings or nulls.
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub size: Option<f64>,
}

impl DepthMessage {
    #[must_use]
    pub fn new(lat: f64, lng: f64, depth: f64) -> Self {
        Self {
            kind: DEPTH_TYPE.to_owned(),
            location: format!("{lat},{lng}"),
            value: Value::from(depth),
            lng: Some(lng),
            lat: Some(lat),
            size: None,
        }
    }

    /// Depth in metres; anything non-numeric counts as zero.
    #[must_use]
    pub fn depth(&self) -> f64 {
        let depth = match &self.value {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            _ => 0.0,
        };
        if depth.is_finite() { depth } else { 0.0 }
    }

    /// Building coordinates parsed from `location` as `(lat, lon)`.
    pub fn building(&self) -> Result<(f64, f64), GeoError> {
        geo::parse_location(&self.location)
    }
}

// =============================================================================
// CAMERA
// =============================================================================

/// One street-level camera pose from the producer's image metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub fov: Option<f64>,
    #[serde(default)]
    pub pitch: Option<f64>,
    #[serde(default)]
    pub uuid: Option<String>,
}

// =============================================================================
// MASK SAVED
// =============================================================================

/// Broadcast after `/save-mask` writes a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskSaved {
    #[serde(rename = "type")]
    pub kind: String,
    pub uuid: String,
    pub filename: String,
    pub url: String,
}

impl MaskSaved {
    #[must_use]
    pub fn new(uuid: impl Into<String>, filename: impl Into<String>, url: impl Into<String>) -> Self {
        Self { kind: MASK_SAVED_TYPE.to_owned(), uuid: uuid.into(), filename: filename.into(), url: url.into() }
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MessageError {
    #[error("payload is neither a depth event nor a camera array")]
    Unrecognized,
    #[error("camera array is empty")]
    EmptyCameras,
    #[error("invalid depth event: {0}")]
    InvalidDepth(String),
    #[error("invalid camera pose: {0}")]
    InvalidCamera(String),
}

/// A relay payload a viewer knows how to handle.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayMessage {
    Depth(DepthMessage),
    Cameras(Vec<CameraPose>),
}

impl RelayMessage {
    /// Decide what a raw payload is without altering it.
    pub fn classify(value: &Value) -> Result<Self, MessageError> {
        match value {
            Value::Object(map) if map.get("type").and_then(Value::as_str) == Some(DEPTH_TYPE) => {
                let msg: DepthMessage =
                    serde_json::from_value(value.clone()).map_err(|e| MessageError::InvalidDepth(e.to_string()))?;
                msg.building().map_err(|e| MessageError::InvalidDepth(e.to_string()))?;
                Ok(Self::Depth(msg))
            }
            Value::Array(items) => {
                // Viewers only act on the first pose; later entries are kept
                // when they parse and skipped otherwise.
                let (first, rest) = items.split_first().ok_or(MessageError::EmptyCameras)?;
                let first = serde_json::from_value::<CameraPose>(first.clone())
                    .map_err(|e| MessageError::InvalidCamera(e.to_string()))?;
                if !first.lat.is_finite() || !first.lng.is_finite() {
                    return Err(MessageError::InvalidCamera("non-finite coordinates".into()));
                }
                let mut poses = vec![first];
                poses.extend(rest.iter().filter_map(|item| serde_json::from_value::<CameraPose>(item.clone()).ok()));
                Ok(Self::Cameras(poses))
            }
            _ => Err(MessageError::Unrecognized),
        }
    }

    /// Short label for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Depth(_) => "depth",
            Self::Cameras(_) => "cameras",
        }
    }
}

/// Parse SSE event data, tolerating producers that JSON-encode twice.
#[must_use]
pub fn parse_event_data(data: &str) -> Option<Value> {
    let value: Value = serde_json::from_str(data).ok()?;
    match value {
        Value::String(inner) => serde_json::from_str(&inner).ok(),
        other => Some(other),
    }
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
