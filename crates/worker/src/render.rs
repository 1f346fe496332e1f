//! Preview renderers for a finished animation.
//!
//! Both previews are optional extras: the service treats every
//! [`RenderError`] as "no preview" and still returns the animated mesh.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::process::{run_command, CommandLine, ProcessError};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("{0} renderer is not configured")]
    NotConfigured(&'static str),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("renderer exited with code {exit_code}: {stderr}")]
    Failed { exit_code: i32, stderr: String },

    #[error("renderer did not produce {0}")]
    MissingOutput(PathBuf),
}

/// Renders preview artifacts from an animated `.glb`.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render a still thumbnail of `input` to `output`.
    async fn render_thumbnail(&self, input: &Path, output: &Path) -> Result<(), RenderError>;

    /// Render frames of `input` into `frames_dir` and assemble an animated
    /// preview. Returns the preview path, or `None` if the renderer finished
    /// without producing one.
    async fn render_preview(
        &self,
        input: &Path,
        frames_dir: &Path,
    ) -> Result<Option<PathBuf>, RenderError>;
}

/// Runs configured external programs for each preview.
///
/// - thumbnail: `<command> <input.glb> <output.png>`; must create the output.
/// - preview: `<command> <input.glb> <frames_dir>`; prints the GIF path as its
///   last stdout line.
pub struct CommandRenderer {
    thumbnail: Option<CommandLine>,
    preview: Option<CommandLine>,
    timeout: Duration,
}

impl CommandRenderer {
    pub fn new(
        thumbnail: Option<CommandLine>,
        preview: Option<CommandLine>,
        timeout: Duration,
    ) -> Self {
        Self {
            thumbnail,
            preview,
            timeout,
        }
    }
}

#[async_trait]
impl Renderer for CommandRenderer {
    async fn render_thumbnail(&self, input: &Path, output: &Path) -> Result<(), RenderError> {
        let command = self
            .thumbnail
            .as_ref()
            .ok_or(RenderError::NotConfigured("thumbnail"))?;
        let mut cmd = command.to_command();
        cmd.arg(input).arg(output);

        let result = run_command(&mut cmd, None, self.timeout).await?;
        if !result.success() {
            return Err(RenderError::Failed {
                exit_code: result.exit_code,
                stderr: result.stderr_tail().to_string(),
            });
        }
        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(RenderError::MissingOutput(output.to_path_buf()));
        }
        Ok(())
    }

    async fn render_preview(
        &self,
        input: &Path,
        frames_dir: &Path,
    ) -> Result<Option<PathBuf>, RenderError> {
        let command = self
            .preview
            .as_ref()
            .ok_or(RenderError::NotConfigured("preview"))?;
        let mut cmd = command.to_command();
        cmd.arg(input).arg(frames_dir);

        let result = run_command(&mut cmd, None, self.timeout).await?;
        if !result.success() {
            return Err(RenderError::Failed {
                exit_code: result.exit_code,
                stderr: result.stderr_tail().to_string(),
            });
        }
        Ok(result.last_line().map(PathBuf::from))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn unconfigured_renderers_report_not_configured() {
        let renderer = CommandRenderer::new(None, None, Duration::from_secs(1));
        let err = renderer
            .render_thumbnail(Path::new("a.glb"), Path::new("a.png"))
            .await
            .unwrap_err();
        assert_matches!(err, RenderError::NotConfigured("thumbnail"));

        let err = renderer
            .render_preview(Path::new("a.glb"), Path::new("frames"))
            .await
            .unwrap_err();
        assert_matches!(err, RenderError::NotConfigured("preview"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn thumbnail_must_exist_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = CommandRenderer::new(
            Some(CommandLine::new("true", Vec::new())),
            None,
            Duration::from_secs(5),
        );
        let output = dir.path().join("thumb.png");
        let err = renderer
            .render_thumbnail(Path::new("in.glb"), &output)
            .await
            .unwrap_err();
        assert_matches!(err, RenderError::MissingOutput(p) if p == output);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn preview_path_comes_from_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("preview.sh");
        std::fs::write(&script, "echo \"$2/preview.gif\"\n").unwrap();
        let renderer = CommandRenderer::new(
            None,
            Some(CommandLine::new(
                "sh",
                vec![script.to_string_lossy().into_owned()],
            )),
            Duration::from_secs(5),
        );

        let gif = renderer
            .render_preview(Path::new("in.glb"), dir.path())
            .await
            .unwrap();
        assert_eq!(gif, Some(dir.path().join("preview.gif")));
    }
}
