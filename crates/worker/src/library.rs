//! Lookup of animation clips on local disk.

use std::path::PathBuf;

use mia_core::error::CoreError;
use mia_core::job::AnimationName;

/// Directory containing one `<name>.fbx` clip per [`AnimationName`].
#[derive(Debug, Clone)]
pub struct AnimationLibrary {
    root: PathBuf,
}

impl AnimationLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the clip for `name`.
    ///
    /// A missing clip means the worker was deployed without its animation
    /// library; it is logged as an error here even though the caller only
    /// sees a 404.
    pub async fn resolve(&self, name: AnimationName) -> Result<PathBuf, CoreError> {
        let path = self.root.join(name.file_name());
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            _ => {
                tracing::error!(
                    animation = %name,
                    path = %path.display(),
                    "Animation clip missing from library; check the worker deployment",
                );
                Err(CoreError::NotFound(format!(
                    "Animation file not found: {}",
                    path.display()
                )))
            }
        }
    }

    /// Names whose clip is present. Used for startup diagnostics.
    pub async fn available(&self) -> Vec<AnimationName> {
        let mut found = Vec::new();
        for name in AnimationName::ALL {
            if tokio::fs::metadata(self.root.join(name.file_name()))
                .await
                .map(|m| m.is_file())
                .unwrap_or(false)
            {
                found.push(name);
            }
        }
        found
    }
}
