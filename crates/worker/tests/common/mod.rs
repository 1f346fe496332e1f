#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use mia_worker::auth::identity::{IdentityError, IdentityProvider, UserAttributes};
use mia_worker::auth::{AuthGate, Credential};
use mia_worker::config::WorkerConfig;
use mia_worker::library::AnimationLibrary;
use mia_worker::pipeline::{Pipeline, PipelineError, PipelineInput};
use mia_worker::render::{RenderError, Renderer};
use mia_worker::router::build_app_router;
use mia_worker::scratch::ScratchSpace;
use mia_worker::service::AnimationService;
use mia_worker::state::AppState;

pub const VALID_KEY: &str = "valid-key";

/// Bytes the stub pipeline writes as its animated `.glb`.
pub const ANIMATED_GLB: &[u8] = b"glTF\x02\x00\x00\x00animated";
pub const THUMBNAIL_PNG: &[u8] = b"\x89PNG thumbnail";
pub const PREVIEW_GIF: &[u8] = b"GIF89a preview";

// ---------------------------------------------------------------------------
// Stub capabilities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub enum PipelineBehaviour {
    /// Write [`ANIMATED_GLB`] into the output directory.
    Succeed,
    /// Return a pipeline error.
    Fail,
    /// Report success with a path that does not exist.
    ReportMissing,
    /// Write the artifact next to the scratch mesh instead of into the
    /// output directory.
    WriteOutside,
}

/// Records every call so tests can assert on what the worker handed over.
pub struct StubPipeline {
    behaviour: PipelineBehaviour,
    delay: Duration,
    pub calls: AtomicUsize,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
    /// `(mesh_path, mesh existed during the run, output_dir)` per call.
    pub seen: Mutex<Vec<(PathBuf, bool, PathBuf)>>,
}

impl StubPipeline {
    pub fn new(behaviour: PipelineBehaviour) -> Self {
        Self::with_delay(behaviour, Duration::ZERO)
    }

    pub fn with_delay(behaviour: PipelineBehaviour, delay: Duration) -> Self {
        Self {
            behaviour,
            delay,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Pipeline for StubPipeline {
    async fn run(&self, input: PipelineInput) -> Result<PathBuf, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        self.seen.lock().unwrap().push((
            input.mesh_path.clone(),
            input.mesh_path.is_file(),
            input.output_dir.clone(),
        ));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = match self.behaviour {
            PipelineBehaviour::Succeed => {
                let artifact = input.output_dir.join("animated.glb");
                std::fs::write(&artifact, ANIMATED_GLB).unwrap();
                Ok(artifact)
            }
            PipelineBehaviour::Fail => Err(PipelineError::Other("CUDA out of memory".into())),
            PipelineBehaviour::ReportMissing => Ok(input.output_dir.join("missing.glb")),
            PipelineBehaviour::WriteOutside => {
                let artifact = input.mesh_path.with_extension("stray.glb");
                std::fs::write(&artifact, ANIMATED_GLB).unwrap();
                Ok(artifact)
            }
        };
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Renders fixed previews, or fails every render.
pub struct StubRenderer {
    pub fail: bool,
}

#[async_trait]
impl Renderer for StubRenderer {
    async fn render_thumbnail(
        &self,
        _input: &std::path::Path,
        output: &std::path::Path,
    ) -> Result<(), RenderError> {
        if self.fail {
            return Err(RenderError::NotConfigured("thumbnail"));
        }
        std::fs::write(output, THUMBNAIL_PNG).unwrap();
        Ok(())
    }

    async fn render_preview(
        &self,
        _input: &std::path::Path,
        frames_dir: &std::path::Path,
    ) -> Result<Option<PathBuf>, RenderError> {
        if self.fail {
            return Err(RenderError::Failed {
                exit_code: 1,
                stderr: "blender crashed".into(),
            });
        }
        let gif = frames_dir.join("preview.gif");
        std::fs::write(&gif, PREVIEW_GIF).unwrap();
        Ok(Some(gif))
    }
}

/// Accepts only [`VALID_KEY`] and counts verifications.
#[derive(Default)]
pub struct StubIdentity {
    pub calls: AtomicUsize,
}

impl StubIdentity {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn verify(&self, credential: &Credential) -> Result<UserAttributes, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if credential.value() == VALID_KEY {
            let mut attributes = serde_json::Map::new();
            attributes.insert("email".into(), "dev@example.com".into());
            Ok(UserAttributes(attributes))
        } else {
            Err(IdentityError::Rejected)
        }
    }
}

// ---------------------------------------------------------------------------
// Test application
// ---------------------------------------------------------------------------

/// A worker wired to stubs, plus handles for inspecting them.
pub struct TestWorker {
    pub app: Router,
    pub pipeline: Arc<StubPipeline>,
    pub identity: Arc<StubIdentity>,
    pub scratch: TempDir,
    _animations: TempDir,
}

impl TestWorker {
    /// Number of entries left in the scratch root.
    pub fn scratch_entries(&self) -> usize {
        std::fs::read_dir(self.scratch.path()).unwrap().count()
    }
}

/// Build the full worker router with stubs behind the capability traits.
///
/// The animation library contains every clip except `walking.fbx`.
pub fn build_test_worker(pipeline: StubPipeline, renderer: StubRenderer) -> TestWorker {
    build_worker(pipeline, renderer, None)
}

/// Default stubs with `MAX_BODY_BYTES` set.
pub fn build_limited_worker(max_body_bytes: usize) -> TestWorker {
    build_worker(
        StubPipeline::new(PipelineBehaviour::Succeed),
        StubRenderer { fail: false },
        Some(max_body_bytes),
    )
}

fn build_worker(
    pipeline: StubPipeline,
    renderer: StubRenderer,
    max_body_bytes: Option<usize>,
) -> TestWorker {
    let animations = tempfile::tempdir().unwrap();
    for name in ["running", "jumping", "punching", "waving"] {
        std::fs::write(animations.path().join(format!("{name}.fbx")), b"Kaydara FBX clip")
            .unwrap();
    }
    let scratch = tempfile::tempdir().unwrap();

    let scratch_dir = scratch.path().to_string_lossy().into_owned();
    let animation_dir = animations.path().to_string_lossy().into_owned();
    let config = WorkerConfig::from_lookup(|key| match key {
        "SCRATCH_DIR" => Some(scratch_dir.clone()),
        "ANIMATION_DIR" => Some(animation_dir.clone()),
        "MAX_BODY_BYTES" => max_body_bytes.map(|n| n.to_string()),
        _ => None,
    })
    .unwrap();

    let pipeline = Arc::new(pipeline);
    let identity = Arc::new(StubIdentity::default());

    let service = AnimationService::new(
        AnimationLibrary::new(&config.animation_dir),
        ScratchSpace::new(&config.scratch_dir),
        pipeline.clone(),
        Arc::new(renderer),
    );
    let state = AppState {
        auth: Arc::new(AuthGate::new(identity.clone(), Duration::from_secs(300))),
        service: Arc::new(service),
    };

    TestWorker {
        app: build_app_router(state, &config),
        pipeline,
        identity,
        scratch,
        _animations: animations,
    }
}

/// Worker whose pipeline succeeds and whose renderers produce previews.
pub fn build_default_worker() -> TestWorker {
    build_test_worker(
        StubPipeline::new(PipelineBehaviour::Succeed),
        StubRenderer { fail: false },
    )
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub fn glb_b64() -> String {
    STANDARD.encode(b"glTF\x02\x00\x00\x00mesh-body")
}

pub fn animate_body(mesh_b64: &str, animation: &str) -> serde_json::Value {
    serde_json::json!({
        "mesh_b64_str": mesh_b64,
        "animation_name": animation,
    })
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// POST a raw body to `/animate` with an optional `x-api-key`.
pub async fn post_animate_raw(app: Router, api_key: Option<&str>, body: Vec<u8>) -> Response<Body> {
    let mut builder = Request::post("/animate").header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    app.oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap()
}

pub async fn post_animate(
    app: Router,
    api_key: Option<&str>,
    body: &serde_json::Value,
) -> Response<Body> {
    post_animate_raw(app, api_key, serde_json::to_vec(body).unwrap()).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
