use mia_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error(transparent)]
    Config(#[from] CoreError),

    #[error("failed to start {name} ('{program}'): {source}")]
    Spawn {
        name: String,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{name} exited unexpectedly ({status})")]
    ChildExited { name: String, status: String },
}
