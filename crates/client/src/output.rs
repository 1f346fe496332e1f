use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use mia_core::job::AnimationJobResult;

use crate::error::ClientError;

pub const MESH_FILE: &str = "animated_mesh.glb";
pub const GIF_FILE: &str = "animation.gif";
pub const THUMBNAIL_FILE: &str = "thumbnail.png";

/// Files written for one result. A preview the service did not produce is
/// `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedOutputs {
    pub mesh: PathBuf,
    pub gif: Option<PathBuf>,
    pub thumbnail: Option<PathBuf>,
}

/// Decode every field of `result` into `dir`.
///
/// Nothing is written unless all present fields decode.
pub async fn save_outputs(
    result: &AnimationJobResult,
    dir: &Path,
) -> Result<SavedOutputs, ClientError> {
    if result.mesh_base64.is_empty() {
        return Err(ClientError::Decode("response carried no mesh".into()));
    }
    let mesh = decode("mesh_base64", &result.mesh_base64)?;
    let gif = result
        .gif_base64
        .as_deref()
        .map(|b| decode("gif_base64", b))
        .transpose()?;
    let thumbnail = result
        .thumbnail_base64
        .as_deref()
        .map(|b| decode("thumbnail_base64", b))
        .transpose()?;

    let saved = SavedOutputs {
        mesh: write(dir.join(MESH_FILE), mesh).await?,
        gif: match gif {
            Some(bytes) => Some(write(dir.join(GIF_FILE), bytes).await?),
            None => None,
        },
        thumbnail: match thumbnail {
            Some(bytes) => Some(write(dir.join(THUMBNAIL_FILE), bytes).await?),
            None => None,
        },
    };
    Ok(saved)
}

fn decode(field: &str, encoded: &str) -> Result<Vec<u8>, ClientError> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| ClientError::Decode(format!("{field} is not valid base64: {e}")))
}

async fn write(path: PathBuf, bytes: Vec<u8>) -> Result<PathBuf, ClientError> {
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|source| ClientError::Io {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}
