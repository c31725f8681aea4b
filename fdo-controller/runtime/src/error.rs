use crate::core;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("kubernetes API request failed: {0}")]
    Kube(#[from] kube::Error),

    #[error("invalid server configuration: {0}")]
    Config(#[source] core::Error),

    #[error("invalid serviceinfo file: {0}")]
    ServiceInfoFile(#[source] core::Error),

    #[error("resource is missing {0}")]
    MissingObjectKey(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// How long to wait before retrying a failed reconcile.
    pub fn requeue_after(&self) -> Duration {
        match self {
            // Leave time for the ConfigMap to be fixed.
            Self::ServiceInfoFile(_) => Duration::from_secs(30),
            Self::Config(_) => Duration::from_secs(60),
            Self::Kube(_) | Self::MissingObjectKey(_) => Duration::from_secs(5),
        }
    }
}

impl From<core::Error> for Error {
    fn from(error: core::Error) -> Self {
        match error {
            core::Error::IncompleteFile(_) | core::Error::MissingFileData { .. } => {
                Self::ServiceInfoFile(error)
            }
            error => Self::Config(error),
        }
    }
}
