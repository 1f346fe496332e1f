//! Mesh payload decoding and container sniffing.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::CoreError;

/// Leading bytes of a binary glTF container.
const GLB_MAGIC: &[u8] = b"glTF";

/// Leading bytes of a binary FBX file.
const FBX_MAGIC: &[u8] = b"Kaydara FBX";

/// The two mesh containers the pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Glb,
    Fbx,
}

impl MeshFormat {
    /// Classify raw bytes by their signature.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(GLB_MAGIC) {
            Some(MeshFormat::Glb)
        } else if bytes.starts_with(FBX_MAGIC) {
            Some(MeshFormat::Fbx)
        } else {
            None
        }
    }

    /// File extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            MeshFormat::Glb => ".glb",
            MeshFormat::Fbx => ".fbx",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MeshFormat::Glb => "glb",
            MeshFormat::Fbx => "fbx",
        }
    }
}

/// A decoded, non-empty mesh with a recognised container signature.
#[derive(Debug, Clone)]
pub struct MeshPayload {
    bytes: Vec<u8>,
    format: MeshFormat,
}

impl MeshPayload {
    /// Decode the base64 `mesh_b64_str` field and validate its contents.
    ///
    /// Fails with [`CoreError::Validation`] when the string is not base64,
    /// decodes to nothing, or carries an unknown signature.
    pub fn decode(encoded: &str) -> Result<Self, CoreError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CoreError::Validation(format!("mesh_b64_str is not valid base64: {e}")))?;
        Self::from_bytes(bytes)
    }

    /// Validate already-decoded mesh bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CoreError> {
        if bytes.is_empty() {
            return Err(CoreError::Validation(
                "Received empty mesh data. The 'mesh_b64_str' field in the request payload cannot be empty."
                    .to_string(),
            ));
        }
        let format = MeshFormat::detect(&bytes).ok_or_else(|| {
            CoreError::Validation("Unsupported mesh format. Supported: .glb or .fbx".to_string())
        })?;
        Ok(Self { bytes, format })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> MeshFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
