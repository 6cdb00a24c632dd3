//! 外部のエージェントに公開するツール一覧
//!
//! ツール名・説明・JSON Schema を宣言し、呼び出しを各操作に振り分ける。

use std::path::PathBuf;

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::download::{download_blob, DownloadOptions};
use crate::list::list_blobs;
use crate::upload::{upload_blob, UploadOptions};
use crate::{Error, Result, ToolContext};

/// upload-blob の引数
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadBlobArgs {
    /// Name of the Azure Blob container
    pub container_name: String,
    /// Name of the blob in Azure Storage
    pub blob_name: String,
    /// Path to the file to upload
    #[serde(default)]
    pub file_path: Option<String>,
    /// Text content to upload
    #[serde(default)]
    pub text_content: Option<String>,
}

impl From<UploadBlobArgs> for UploadOptions {
    fn from(args: UploadBlobArgs) -> Self {
        UploadOptions {
            file_path: args.file_path.map(PathBuf::from),
            text_content: args.text_content,
        }
    }
}

/// download-blob の引数
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadBlobArgs {
    /// Name of the Azure Blob container
    pub container_name: String,
    /// Name of the blob in Azure Storage
    pub blob_name: String,
    /// Local path to save the downloaded file
    #[serde(default)]
    pub path_file: Option<String>,
    /// Whether to return the content as text instead of saving to file
    #[serde(default)]
    pub as_text: Option<bool>,
}

impl From<DownloadBlobArgs> for DownloadOptions {
    fn from(args: DownloadBlobArgs) -> Self {
        DownloadOptions {
            path_file: args.path_file.map(PathBuf::from),
            as_text: args.as_text.unwrap_or(false),
        }
    }
}

/// list-blobs の引数
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListBlobsArgs {
    /// Name of the Azure Blob container
    pub container_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    UploadBlob,
    DownloadBlob,
    ListBlobs,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [
        ToolKind::UploadBlob,
        ToolKind::DownloadBlob,
        ToolKind::ListBlobs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::UploadBlob => "upload-blob",
            ToolKind::DownloadBlob => "download-blob",
            ToolKind::ListBlobs => "list-blobs",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolKind::UploadBlob => "Upload content to Azure Blob Storage",
            ToolKind::DownloadBlob => "Download content from Azure Blob Storage",
            ToolKind::ListBlobs => "List all blobs in an Azure Storage container",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    fn parameters(self) -> Result<Value> {
        let schema = match self {
            ToolKind::UploadBlob => schema_for!(UploadBlobArgs),
            ToolKind::DownloadBlob => schema_for!(DownloadBlobArgs),
            ToolKind::ListBlobs => schema_for!(ListBlobsArgs),
        };
        Ok(serde_json::to_value(schema)?)
    }
}

/// ツール定義（名前・説明・引数スキーマ）
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

pub struct ToolRegistry {
    ctx: ToolContext,
    definitions: Vec<ToolDefinition>,
}

impl ToolRegistry {
    pub fn new(ctx: ToolContext) -> Result<Self> {
        let definitions = ToolKind::ALL
            .into_iter()
            .map(|kind| {
                Ok(ToolDefinition {
                    name: kind.name(),
                    description: kind.description(),
                    parameters: kind.parameters()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { ctx, definitions })
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn definition(&self, name: &str) -> Option<&ToolDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// ツールを名前で呼び出す
    ///
    /// 排他的な引数の組はここでも検証し、リモート呼び出し前に弾く。
    pub async fn execute(&self, name: &str, args: Value) -> Result<String> {
        let kind =
            ToolKind::from_name(name).ok_or_else(|| Error::UnknownTool(name.to_string()))?;
        debug!("Executing tool {}", name);

        match kind {
            ToolKind::UploadBlob => {
                let args: UploadBlobArgs = parse_args(args)?;
                let container_name = args.container_name.clone();
                let blob_name = args.blob_name.clone();
                let options = UploadOptions::from(args);
                options.clone().into_source()?;

                upload_blob(&self.ctx, &container_name, &blob_name, options).await
            }
            ToolKind::DownloadBlob => {
                let args: DownloadBlobArgs = parse_args(args)?;
                let container_name = args.container_name.clone();
                let blob_name = args.blob_name.clone();
                let options = DownloadOptions::from(args);
                options.clone().into_target()?;

                download_blob(&self.ctx, &container_name, &blob_name, options).await
            }
            ToolKind::ListBlobs => {
                let args: ListBlobsArgs = parse_args(args)?;
                list_blobs(&self.ctx, &args.container_name).await
            }
        }
    }
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    let args = match args {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(args).map_err(|e| Error::InvalidArgument(e.to_string()))
}
