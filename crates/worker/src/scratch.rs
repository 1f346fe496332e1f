//! Request-scoped scratch storage.
//!
//! Every request gets uniquely named files and directories under the
//! worker's scratch root. The handles returned here delete what they own
//! when dropped, so cleanup happens on every exit path, including errors and
//! panics unwinding through the handler.

use std::io::Write;
use std::path::{Path, PathBuf};

use mia_core::mesh::MeshPayload;
use tempfile::{Builder, TempDir, TempPath};
use uuid::Uuid;

/// The uploaded mesh materialised on disk. Removed on drop.
#[derive(Debug)]
pub struct ScratchFile {
    path: TempPath,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Directory holding a job's pipeline output and rendered previews.
///
/// [`JobDir::remove`] deletes the tree on the blocking pool; dropping the
/// handle without it still removes the tree, on the current thread.
#[derive(Debug)]
pub struct JobDir {
    dir: TempDir,
}

impl JobDir {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the pipeline writes its artifacts.
    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("output")
    }

    /// Where preview renderers write.
    pub fn render_dir(&self) -> PathBuf {
        self.dir.path().join("render")
    }

    /// Delete the directory and everything rendered into it.
    pub async fn remove(self) -> std::io::Result<()> {
        tokio::task::spawn_blocking(move || self.dir.close())
            .await
            .map_err(std::io::Error::other)?
    }
}

/// Where a file path printed by an external program actually points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportedFile {
    /// An existing file under the expected directory, canonicalised.
    Inside(PathBuf),
    /// An existing file somewhere else.
    Outside(PathBuf),
    /// Nothing readable at that path.
    Missing,
}

/// Classify `reported` against `root`. Symlinks and `..` are resolved before
/// the containment check.
pub async fn locate_reported(root: &Path, reported: &Path) -> ReportedFile {
    let Ok(file) = tokio::fs::canonicalize(reported).await else {
        return ReportedFile::Missing;
    };
    if !tokio::fs::metadata(&file)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
    {
        return ReportedFile::Missing;
    }
    match tokio::fs::canonicalize(root).await {
        Ok(root) if file.starts_with(&root) => ReportedFile::Inside(file),
        _ => ReportedFile::Outside(file),
    }
}

/// Factory for scratch files rooted at one directory.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `mesh` to a new randomly named file with the mesh's extension.
    pub async fn write_mesh(&self, job_id: Uuid, mesh: &MeshPayload) -> std::io::Result<ScratchFile> {
        let root = self.root.clone();
        let prefix = format!("mia-mesh-{job_id}-");
        let suffix = mesh.format().extension();
        let bytes = mesh.bytes().to_vec();

        let path = tokio::task::spawn_blocking(move || -> std::io::Result<TempPath> {
            let mut file = Builder::new()
                .prefix(&prefix)
                .suffix(suffix)
                .tempfile_in(&root)?;
            file.write_all(&bytes)?;
            file.flush()?;
            Ok(file.into_temp_path())
        })
        .await
        .map_err(std::io::Error::other)??;

        Ok(ScratchFile { path })
    }

    /// Create the job directory with empty `output/` and `render/` children.
    pub async fn create_job_dir(&self, job_id: Uuid) -> std::io::Result<JobDir> {
        let root = self.root.clone();
        let prefix = format!("mia-job-{job_id}-");

        tokio::task::spawn_blocking(move || -> std::io::Result<JobDir> {
            let dir = Builder::new().prefix(&prefix).tempdir_in(&root)?;
            let job = JobDir { dir };
            std::fs::create_dir(job.output_dir())?;
            std::fs::create_dir(job.render_dir())?;
            Ok(job)
        })
        .await
        .map_err(std::io::Error::other)?
    }
}
