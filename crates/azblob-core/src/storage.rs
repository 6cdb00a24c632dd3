use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::stream::BoxStream;
use futures::TryStreamExt;
use serde::{Serialize, Serializer};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::config::StorageConfig;
use crate::Result;

/// ダウンロード時に順次届くチャンクのストリーム
pub type ChunkStream = BoxStream<'static, Result<Bytes>>;

/// 一覧取得で返す Blob のメタデータ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_millis"
    )]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

fn serialize_millis<S>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(ts) => serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => serializer.serialize_none(),
    }
}

/// アップロード元（ファイルかテキストのどちらか一方）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    File(PathBuf),
    Text(String),
}

/// ダウンロード先（ファイルかテキスト返却のどちらか一方）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadTarget {
    File(PathBuf),
    Text,
}

/// コンテナ単位のクライアント
#[async_trait]
pub trait BlobContainer: Send + Sync {
    fn name(&self) -> &str;

    async fn exists(&self) -> Result<bool>;

    /// コンテナが存在しなければ作成（既に存在する場合はエラーにしない）
    async fn create_if_not_exists(&self) -> Result<()>;

    /// フラットに全 Blob を列挙する（継続トークンは内部で辿る）
    async fn list_blobs(&self) -> Result<Vec<BlobMetadata>>;

    fn blob(&self, blob_name: &str) -> Box<dyn BlobHandle>;
}

/// Blob 単位のクライアント
#[async_trait]
pub trait BlobHandle: Send + Sync {
    fn url(&self) -> Result<String>;

    async fn exists(&self) -> Result<bool>;

    async fn upload_file(&self, path: &Path) -> Result<()>;

    async fn upload_bytes(&self, data: Bytes) -> Result<()>;

    /// 内容を `path` に保存する（失敗時は既存ファイルを残す）
    async fn download_to_file(&self, path: &Path) -> Result<()> {
        let chunks = self.download_stream().await?;
        write_atomically(path, chunks).await
    }

    async fn download_stream(&self) -> Result<ChunkStream>;
}

/// チャンクを同じディレクトリの一時ファイルに書き、完了後に `path` へ rename する
///
/// 途中で失敗した場合は一時ファイルを削除し、`path` には触れない。
pub async fn write_atomically(path: &Path, mut chunks: ChunkStream) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let (file, temp_path) = NamedTempFile::new_in(dir)?.into_parts();
    let mut file = tokio::fs::File::from_std(file);

    // エラーで抜けると temp_path の drop で一時ファイルが消える
    while let Some(chunk) = chunks.try_next().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    temp_path.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// 接続文字列からコンテナクライアントを作るファクトリ
pub trait StorageClientFactory: Send + Sync {
    fn container_client(
        &self,
        config: &StorageConfig,
        container_name: &str,
    ) -> Result<Box<dyn BlobContainer>>;
}
