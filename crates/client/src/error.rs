use std::path::PathBuf;

use mia_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] CoreError),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("request failed [{status}]: {body}")]
    Rejected { status: u16, body: String },

    #[error("unreadable response: {0}")]
    Decode(String),
}
