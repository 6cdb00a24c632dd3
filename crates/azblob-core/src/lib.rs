pub mod azure;
pub mod config;
pub mod context;
pub mod download;
pub mod error;
pub mod list;
pub mod registry;
pub mod settings;
pub mod storage;
pub mod upload;

#[cfg(test)]
mod testing;

pub use config::{ConfigProvider, EnvConfigProvider, StaticConfigProvider, StorageConfig};
pub use context::ToolContext;
pub use download::{download_blob, DownloadOptions};
pub use error::{Error, Result};
pub use list::list_blobs;
pub use registry::{ToolDefinition, ToolKind, ToolRegistry};
pub use settings::Settings;
pub use storage::{BlobContainer, BlobHandle, BlobMetadata, StorageClientFactory};
pub use upload::{upload_blob, UploadOptions};
