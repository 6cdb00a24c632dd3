use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    ConfigurationMissing(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    StorageOperationFailed(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn blob_not_found(blob_name: &str, container_name: &str) -> Self {
        Error::NotFound(format!(
            "Blob {} does not exist in container {}",
            blob_name, container_name
        ))
    }

    pub fn container_not_found(container_name: &str) -> Self {
        Error::NotFound(format!("Container {} does not exist", container_name))
    }
}

impl From<azure_core::Error> for Error {
    fn from(err: azure_core::Error) -> Self {
        Error::StorageOperationFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_messages() {
        assert_eq!(
            Error::blob_not_found("a.txt", "docs").to_string(),
            "Blob a.txt does not exist in container docs"
        );
        assert_eq!(
            Error::container_not_found("docs").to_string(),
            "Container docs does not exist"
        );
    }

    #[test]
    fn test_passthrough_messages() {
        let err = Error::StorageOperationFailed("AuthorizationFailure".into());
        assert_eq!(err.to_string(), "AuthorizationFailure");

        let err = Error::UnknownTool("delete-blob".into());
        assert_eq!(err.to_string(), "Unknown tool: delete-blob");
    }
}
