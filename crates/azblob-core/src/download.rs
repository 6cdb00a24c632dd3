use std::path::{Path, PathBuf};

use futures::TryStreamExt;
use tracing::{debug, info};

use crate::storage::{BlobHandle, DownloadTarget};
use crate::{Result, ToolContext};

pub const MISSING_DOWNLOAD_TARGET: &str = "Either pathFile or asText must be provided";

/// ダウンロード引数（呼び出し側から渡される生の値）
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    pub path_file: Option<PathBuf>,
    pub as_text: bool,
}

impl DownloadOptions {
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path_file: Some(path.into()),
            as_text: false,
        }
    }

    pub fn as_text() -> Self {
        Self {
            path_file: None,
            as_text: true,
        }
    }

    /// 引数を `DownloadTarget` に変換する（両方ある場合はファイルを優先）
    pub fn into_target(self) -> Result<DownloadTarget> {
        match self.path_file.filter(|p| !p.as_os_str().is_empty()) {
            Some(path) => Ok(DownloadTarget::File(path)),
            None if self.as_text => Ok(DownloadTarget::Text),
            None => Err(crate::Error::InvalidArgument(MISSING_DOWNLOAD_TARGET.into())),
        }
    }
}

/// Blob をファイルに保存するか、テキストとして返す
///
/// 存在確認は引数の検証より先に必ず行う。
pub async fn download_blob(
    ctx: &ToolContext,
    container_name: &str,
    blob_name: &str,
    options: DownloadOptions,
) -> Result<String> {
    let container = ctx.connect(container_name)?;
    let blob = container.blob(blob_name);

    if !blob.exists().await? {
        return Err(crate::Error::blob_not_found(blob_name, container_name));
    }

    match options.into_target()? {
        DownloadTarget::File(path) => {
            ensure_parent_dir(&path).await?;
            blob.download_to_file(&path).await?;
            info!("Downloaded {}/{} to {}", container_name, blob_name, path.display());
            Ok(format!("File downloaded successfully to: {}", path.display()))
        }
        DownloadTarget::Text => read_text(blob.as_ref()).await,
    }
}

/// 保存先の親ディレクトリが無ければ作成する（作成した場合は true）
async fn ensure_parent_dir(path: &Path) -> Result<bool> {
    let Some(parent) = path.parent() else {
        return Ok(false);
    };
    if parent.as_os_str().is_empty() || tokio::fs::try_exists(parent).await? {
        return Ok(false);
    }

    debug!("Creating directory {}", parent.display());
    tokio::fs::create_dir_all(parent).await?;
    Ok(true)
}

/// チャンクを到着順に連結してから UTF-8 として復号する
///
/// チャンク境界でマルチバイト文字が分断されても壊れない。
async fn read_text(blob: &dyn BlobHandle) -> Result<String> {
    let mut chunks = blob.download_stream().await?;
    let mut buffer = Vec::new();

    while let Some(chunk) = chunks.try_next().await? {
        buffer.extend_from_slice(&chunk);
    }

    debug!("Read {} bytes as text", buffer.len());
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
