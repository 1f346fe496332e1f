//! Capability interface to the external mesh-to-animation pipeline.
//!
//! The worker never looks inside the pipeline: it hands over the
//! materialised mesh, the resolved animation clip and the option bundle, and
//! receives the path of the generated `.glb`.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use mia_core::job::AnimationOptions;
use mia_core::mesh::MeshFormat;

use crate::process::{run_command, CommandLine, ProcessError};

/// Everything one pipeline run needs.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    /// Scratch copy of the uploaded mesh. Only valid for the duration of
    /// the run.
    pub mesh_path: PathBuf,
    pub mesh_format: MeshFormat,
    /// Animation clip from the worker's library.
    pub animation_path: PathBuf,
    pub options: AnimationOptions,
    /// Request-scoped directory the pipeline may write its outputs to.
    pub output_dir: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("pipeline exited with code {exit_code}")]
    Failed { exit_code: i32, stderr: String },

    #[error("pipeline finished without reporting an artifact path")]
    NoArtifact,

    #[error("failed to serialize pipeline options: {0}")]
    Options(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// The opaque inference + retargeting pipeline.
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Run the pipeline and return the path of the animated mesh.
    async fn run(&self, input: PipelineInput) -> Result<PathBuf, PipelineError>;
}

// ---------------------------------------------------------------------------
// Subprocess-backed implementation
// ---------------------------------------------------------------------------

/// Runs the pipeline as an external program.
///
/// Invocation:
///
/// ```text
/// <command> --input <mesh> --animation <clip.fbx> --output-dir <dir> --format <glb|fbx>
/// ```
///
/// The option bundle is written to stdin as JSON. The last non-blank stdout
/// line must be the path of the generated artifact.
pub struct CommandPipeline {
    command: CommandLine,
    timeout: Duration,
}

impl CommandPipeline {
    pub fn new(command: CommandLine, timeout: Duration) -> Self {
        Self { command, timeout }
    }
}

#[async_trait]
impl Pipeline for CommandPipeline {
    async fn run(&self, input: PipelineInput) -> Result<PathBuf, PipelineError> {
        let options = serde_json::to_vec(&input.options)?;

        let mut cmd = self.command.to_command();
        cmd.arg("--input")
            .arg(&input.mesh_path)
            .arg("--animation")
            .arg(&input.animation_path)
            .arg("--output-dir")
            .arg(&input.output_dir)
            .arg("--format")
            .arg(input.mesh_format.as_str());

        tracing::info!(
            program = %self.command.program(),
            mesh = %input.mesh_path.display(),
            animation = %input.animation_path.display(),
            "Starting animation pipeline",
        );

        let output = run_command(&mut cmd, Some(options), self.timeout).await?;

        if !output.success() {
            return Err(PipelineError::Failed {
                exit_code: output.exit_code,
                stderr: output.stderr_tail().to_string(),
            });
        }

        let artifact = output.last_line().ok_or(PipelineError::NoArtifact)?;
        tracing::info!(
            artifact,
            duration_ms = output.duration_ms,
            "Animation pipeline finished",
        );
        Ok(PathBuf::from(artifact))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::Path;

    use assert_matches::assert_matches;

    use super::*;

    fn write_script(dir: &Path, body: &str) -> CommandLine {
        let path = dir.join("pipeline.sh");
        std::fs::write(&path, body).unwrap();
        CommandLine::new("sh", vec![path.to_string_lossy().into_owned()])
    }

    fn input(dir: &Path) -> PipelineInput {
        PipelineInput {
            mesh_path: dir.join("mesh.glb"),
            mesh_format: MeshFormat::Glb,
            animation_path: dir.join("running.fbx"),
            options: AnimationOptions::default(),
            output_dir: dir.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn returns_last_stdout_line_as_artifact() {
        let dir = tempfile::tempdir().unwrap();
        // $6 is the --output-dir value, $8 the --format value.
        let cmd = write_script(
            dir.path(),
            "cat > \"$6/options.json\"\necho progress\necho \"$6/out.$8\"\n",
        );
        let pipeline = CommandPipeline::new(cmd, Duration::from_secs(5));

        let artifact = pipeline.run(input(dir.path())).await.unwrap();
        assert_eq!(artifact, dir.path().join("out.glb"));

        let options: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("options.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(options["bw_vis_bone"], "LeftArm");
    }

    #[tokio::test]
    async fn non_zero_exit_is_failure_with_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = write_script(dir.path(), "echo 'CUDA out of memory' >&2\nexit 2\n");
        let pipeline = CommandPipeline::new(cmd, Duration::from_secs(5));

        let err = pipeline.run(input(dir.path())).await.unwrap_err();
        assert_matches!(err, PipelineError::Failed { exit_code: 2, ref stderr } if stderr.contains("CUDA"));
    }

    #[tokio::test]
    async fn silent_success_is_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = write_script(dir.path(), "exit 0\n");
        let pipeline = CommandPipeline::new(cmd, Duration::from_secs(5));

        let err = pipeline.run(input(dir.path())).await.unwrap_err();
        assert_matches!(err, PipelineError::NoArtifact);
    }
}
