//! The animation job itself, independent of HTTP.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use mia_core::job::{AnimationJobRequest, AnimationJobResult};
use mia_core::mesh::MeshPayload;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::library::AnimationLibrary;
use crate::pipeline::{Pipeline, PipelineInput};
use crate::render::Renderer;
use crate::scratch::{locate_reported, JobDir, ReportedFile, ScratchSpace};

const THUMBNAIL_FILE: &str = "thumbnail.png";
const FRAMES_DIR: &str = "frames";

/// Runs animation jobs on this worker's GPU, one at a time.
pub struct AnimationService {
    library: AnimationLibrary,
    scratch: ScratchSpace,
    pipeline: Arc<dyn Pipeline>,
    renderer: Arc<dyn Renderer>,
    /// Single permit: the pipeline assumes exclusive use of the GPU.
    gpu: Semaphore,
}

impl AnimationService {
    pub fn new(
        library: AnimationLibrary,
        scratch: ScratchSpace,
        pipeline: Arc<dyn Pipeline>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            library,
            scratch,
            pipeline,
            renderer,
            gpu: Semaphore::new(1),
        }
    }

    /// Whether a job currently holds the GPU.
    pub fn gpu_busy(&self) -> bool {
        self.gpu.available_permits() == 0
    }

    /// Validate the request, run the pipeline and package its artifacts.
    ///
    /// Everything that can be rejected cheaply is checked before the GPU
    /// lease is taken, so invalid requests never wait behind a running job.
    pub async fn animate(&self, request: AnimationJobRequest) -> AppResult<AnimationJobResult> {
        let job_id = Uuid::new_v4();
        let animation = request.animation_name;

        let animation_path = self.library.resolve(animation).await?;
        let mesh = MeshPayload::decode(&request.mesh_b64_str)?;

        tracing::info!(
            %job_id,
            animation = %animation,
            format = mesh.format().as_str(),
            mesh_bytes = mesh.len(),
            "Animation job accepted",
        );

        let _lease = self
            .gpu
            .acquire()
            .await
            .map_err(|_| AppError::InternalError("GPU lease semaphore closed".into()))?;
        let started = Instant::now();

        let job_dir = self
            .scratch
            .create_job_dir(job_id)
            .await
            .map_err(|e| AppError::InternalError(format!("failed to create job directory: {e}")))?;

        let result = self
            .run_job(job_id, &mesh, animation_path, &request, &job_dir)
            .await;
        if let Err(e) = job_dir.remove().await {
            tracing::warn!(%job_id, error = %e, "Failed to remove job directory");
        }

        if let Ok(job) = &result {
            tracing::info!(
                %job_id,
                duration_ms = started.elapsed().as_millis() as u64,
                has_thumbnail = job.thumbnail_base64.is_some(),
                has_gif = job.gif_base64.is_some(),
                "Animation job finished",
            );
        }
        result
    }

    /// Everything that writes into the job directory.
    async fn run_job(
        &self,
        job_id: Uuid,
        mesh: &MeshPayload,
        animation_path: PathBuf,
        request: &AnimationJobRequest,
        job_dir: &JobDir,
    ) -> AppResult<AnimationJobResult> {
        let artifact = self
            .run_pipeline(job_id, mesh, animation_path, request, job_dir)
            .await?;

        let mesh_base64 = match tokio::fs::read(&artifact).await {
            Ok(bytes) => STANDARD.encode(bytes),
            Err(e) => {
                tracing::error!(%job_id, artifact = %artifact.display(), error = %e, "Pipeline artifact unreadable");
                return Err(AppError::NoArtifact);
            }
        };

        let render_dir = job_dir.render_dir();
        let thumbnail_base64 = self.thumbnail(job_id, &artifact, &render_dir).await;
        let gif_base64 = self.preview(job_id, &artifact, &render_dir).await;

        Ok(AnimationJobResult {
            mesh_base64,
            gif_base64,
            thumbnail_base64,
        })
    }

    /// Materialize the mesh, run the pipeline and check its artifact. The
    /// scratch mesh is removed as soon as the pipeline returns.
    async fn run_pipeline(
        &self,
        job_id: Uuid,
        mesh: &MeshPayload,
        animation_path: PathBuf,
        request: &AnimationJobRequest,
        job_dir: &JobDir,
    ) -> AppResult<PathBuf> {
        let mesh_file = self
            .scratch
            .write_mesh(job_id, mesh)
            .await
            .map_err(|e| AppError::InternalError(format!("failed to write scratch mesh: {e}")))?;

        let result = self
            .pipeline
            .run(PipelineInput {
                mesh_path: mesh_file.path().to_path_buf(),
                mesh_format: mesh.format(),
                animation_path,
                options: request.options.clone(),
                output_dir: job_dir.output_dir(),
            })
            .await;
        drop(mesh_file);

        let artifact = result.map_err(|e| {
            tracing::error!(%job_id, error = ?e, "Animation pipeline failed");
            AppError::Pipeline(e.to_string())
        })?;

        match locate_reported(&job_dir.output_dir(), &artifact).await {
            ReportedFile::Inside(path) => Ok(path),
            ReportedFile::Outside(path) => {
                tracing::error!(%job_id, artifact = %path.display(), "Pipeline wrote its artifact outside the job directory");
                Err(AppError::Pipeline(
                    "artifact was written outside the job directory".to_string(),
                ))
            }
            ReportedFile::Missing => {
                tracing::error!(%job_id, artifact = %artifact.display(), "Pipeline reported a missing artifact");
                Err(AppError::NoArtifact)
            }
        }
    }

    async fn thumbnail(&self, job_id: Uuid, artifact: &Path, render_dir: &Path) -> Option<String> {
        let output = render_dir.join(THUMBNAIL_FILE);
        if let Err(e) = self.renderer.render_thumbnail(artifact, &output).await {
            tracing::warn!(%job_id, error = %e, "Thumbnail rendering failed");
            return None;
        }
        read_base64(job_id, &output).await
    }

    async fn preview(&self, job_id: Uuid, artifact: &Path, render_dir: &Path) -> Option<String> {
        let frames_dir = render_dir.join(FRAMES_DIR);
        if let Err(e) = tokio::fs::create_dir_all(&frames_dir).await {
            tracing::warn!(%job_id, error = %e, "Could not create preview frames directory");
            return None;
        }
        match self.renderer.render_preview(artifact, &frames_dir).await {
            Ok(Some(gif)) => match locate_reported(render_dir, &gif).await {
                ReportedFile::Inside(path) => read_base64(job_id, &path).await,
                ReportedFile::Outside(path) => {
                    tracing::warn!(%job_id, path = %path.display(), "Preview written outside the job directory, ignored");
                    None
                }
                ReportedFile::Missing => {
                    tracing::warn!(%job_id, path = %gif.display(), "Preview renderer reported a missing GIF");
                    None
                }
            },
            Ok(None) => {
                tracing::warn!(%job_id, "Preview renderer produced no GIF");
                None
            }
            Err(e) => {
                tracing::warn!(%job_id, error = %e, "Preview rendering failed");
                None
            }
        }
    }
}

async fn read_base64(job_id: Uuid, path: &Path) -> Option<String> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Some(STANDARD.encode(bytes)),
        Err(e) => {
            tracing::warn!(%job_id, path = %path.display(), error = %e, "Rendered preview unreadable");
            None
        }
    }
}
