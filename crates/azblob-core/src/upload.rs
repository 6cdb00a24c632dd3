use std::path::PathBuf;

use bytes::Bytes;
use tracing::{debug, info};

use crate::storage::UploadSource;
use crate::{Result, ToolContext};

pub const MISSING_UPLOAD_SOURCE: &str = "Either filePath or textContent must be provided";

/// アップロード引数（呼び出し側から渡される生の値）
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub file_path: Option<PathBuf>,
    pub text_content: Option<String>,
}

impl UploadOptions {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: Some(path.into()),
            text_content: None,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            file_path: None,
            text_content: Some(content.into()),
        }
    }

    /// 引数を `UploadSource` に変換する
    ///
    /// 空文字列は未指定扱い。両方ある場合はファイルを優先する。
    pub fn into_source(self) -> Result<UploadSource> {
        let file_path = self.file_path.filter(|p| !p.as_os_str().is_empty());
        let text_content = self.text_content.filter(|t| !t.is_empty());

        match (file_path, text_content) {
            (Some(path), _) => Ok(UploadSource::File(path)),
            (None, Some(text)) => Ok(UploadSource::Text(text)),
            (None, None) => Err(crate::Error::InvalidArgument(MISSING_UPLOAD_SOURCE.into())),
        }
    }
}

/// Blob をアップロードし、結果の URL を含む確認メッセージを返す
///
/// コンテナが存在しなければ作成する。
pub async fn upload_blob(
    ctx: &ToolContext,
    container_name: &str,
    blob_name: &str,
    options: UploadOptions,
) -> Result<String> {
    let config = ctx.resolve_config()?;
    let source = options.into_source()?;

    let container = ctx.container_client(&config, container_name)?;
    container.create_if_not_exists().await?;

    let blob = container.blob(blob_name);
    match &source {
        UploadSource::File(path) => {
            debug!("Uploading file {} to {}/{}", path.display(), container_name, blob_name);
            blob.upload_file(path).await?;
        }
        UploadSource::Text(text) => {
            debug!("Uploading {} bytes of text to {}/{}", text.len(), container_name, blob_name);
            blob.upload_bytes(Bytes::copy_from_slice(text.as_bytes())).await?;
        }
    }

    let url = blob.url()?;
    info!("Uploaded {}/{}", container_name, blob_name);
    Ok(format!("Content uploaded successfully. URL: {}", url))
}
