//! Wire types for `POST /animate`.
//!
//! The router and the workers accept the same request body and return the
//! same response body, so both are defined once here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Animation selector
// ---------------------------------------------------------------------------

/// The fixed set of animations a worker's library provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationName {
    Running,
    Jumping,
    Punching,
    Walking,
    Waving,
}

impl AnimationName {
    pub const ALL: [AnimationName; 5] = [
        AnimationName::Running,
        AnimationName::Jumping,
        AnimationName::Punching,
        AnimationName::Walking,
        AnimationName::Waving,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnimationName::Running => "running",
            AnimationName::Jumping => "jumping",
            AnimationName::Punching => "punching",
            AnimationName::Walking => "walking",
            AnimationName::Waving => "waving",
        }
    }

    /// File name of the animation clip inside the animation library.
    pub fn file_name(&self) -> String {
        format!("{}.fbx", self.as_str())
    }
}

impl fmt::Display for AnimationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnimationName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnimationName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| {
                let expected: Vec<&str> = AnimationName::ALL.iter().map(|n| n.as_str()).collect();
                CoreError::Validation(format!(
                    "Unknown animation name '{s}'. Expected one of: {}",
                    expected.join(", ")
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_vis_bone() -> String {
    "LeftArm".to_string()
}

/// Knobs forwarded verbatim to the animation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationOptions {
    /// Input is a gaussian-splat rather than a mesh.
    #[serde(default)]
    pub is_gs: bool,
    #[serde(default)]
    pub opacity_threshold: f64,
    /// Strip finger bones before retargeting.
    #[serde(default)]
    pub no_fingers: bool,
    #[serde(default)]
    pub rest_pose_type: Option<String>,
    #[serde(default)]
    pub ignore_pose_parts: Vec<String>,
    #[serde(default)]
    pub input_normal: bool,
    /// Apply the bone-weight fix pass.
    #[serde(default = "default_true")]
    pub bw_fix: bool,
    /// Bone highlighted in the bone-weight visualisation.
    #[serde(default = "default_vis_bone")]
    pub bw_vis_bone: String,
    #[serde(default = "default_true")]
    pub reset_to_rest: bool,
    /// Accepted for compatibility; the worker always resolves the clip itself.
    #[serde(default)]
    pub animation_file: Option<String>,
    #[serde(default = "default_true")]
    pub retarget: bool,
    #[serde(default = "default_true")]
    pub inplace: bool,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            is_gs: false,
            opacity_threshold: 0.0,
            no_fingers: false,
            rest_pose_type: None,
            ignore_pose_parts: Vec::new(),
            input_normal: false,
            bw_fix: true,
            bw_vis_bone: default_vis_bone(),
            reset_to_rest: true,
            animation_file: None,
            retarget: true,
            inplace: true,
        }
    }
}

/// Body of `POST /animate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationJobRequest {
    /// Base64-encoded `.glb` or `.fbx` mesh.
    pub mesh_b64_str: String,
    pub animation_name: AnimationName,
    #[serde(flatten)]
    pub options: AnimationOptions,
}

impl AnimationJobRequest {
    /// Parse a request body, reporting any structural problem (including an
    /// animation name outside the enumerated set) as a validation error.
    pub fn from_json(body: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(body)
            .map_err(|e| CoreError::Validation(format!("Invalid request body: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Body of a successful `POST /animate` response.
///
/// Auxiliary previews are best-effort; when one was not produced its field is
/// serialized as an explicit `null` rather than being left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationJobResult {
    /// The animated mesh (`.glb`), base64-encoded.
    pub mesh_base64: String,
    /// Animated GIF preview, base64-encoded.
    pub gif_base64: Option<String>,
    /// PNG thumbnail, base64-encoded.
    pub thumbnail_base64: Option<String>,
}
