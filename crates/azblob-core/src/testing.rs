//! テスト用のインメモリストレージ
//!
//! リモート呼び出しをすべて `Call` として記録する。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;

use crate::config::{StaticConfigProvider, StorageConfig};
use crate::storage::{
    write_atomically, BlobContainer, BlobHandle, BlobMetadata, ChunkStream, StorageClientFactory,
};
use crate::{Error, Result, ToolContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect(String),
    ContainerExists(String),
    CreateContainer(String),
    ListBlobs(String),
    BlobExists(String),
    UploadFile(String, PathBuf),
    UploadBytes(String, usize),
    DownloadToFile(String, PathBuf),
    DownloadStream(String),
}

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub data: Bytes,
    pub last_modified: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
}

#[derive(Default)]
struct State {
    containers: BTreeMap<String, Vec<(String, StoredBlob)>>,
    calls: Vec<Call>,
    failure: Option<String>,
    stream_failure: Option<String>,
    chunk_size: Option<usize>,
}

#[derive(Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<State>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> ToolContext {
        ToolContext::new(
            Arc::new(StaticConfigProvider::new("UseDevelopmentStorage=true")),
            Arc::new(self.clone()),
        )
    }

    pub fn with_container(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .containers
            .entry(name.to_string())
            .or_default();
        self
    }

    /// 挿入順 = 列挙順
    pub fn with_blob(self, container: &str, name: &str, blob: StoredBlob) -> Self {
        self.state
            .lock()
            .unwrap()
            .containers
            .entry(container.to_string())
            .or_default()
            .push((name.to_string(), blob));
        self
    }

    pub fn with_text_blob(self, container: &str, name: &str, text: &str) -> Self {
        self.with_blob(
            container,
            name,
            StoredBlob {
                data: Bytes::copy_from_slice(text.as_bytes()),
                last_modified: None,
                content_type: Some("text/plain".to_string()),
            },
        )
    }

    /// 以降のリモート呼び出しを指定メッセージで失敗させる
    pub fn failing_with(self, message: &str) -> Self {
        self.state.lock().unwrap().failure = Some(message.to_string());
        self
    }

    /// ダウンロードストリームを最初のチャンクの後で失敗させる
    pub fn failing_stream_with(self, message: &str) -> Self {
        self.state.lock().unwrap().stream_failure = Some(message.to_string());
        self
    }

    /// ダウンロードストリームのチャンクサイズ
    pub fn with_chunk_size(self, size: usize) -> Self {
        self.state.lock().unwrap().chunk_size = Some(size);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|&c| pred(c)).count()
    }

    pub fn remote_calls(&self) -> usize {
        self.count(|c| !matches!(c, Call::Connect(_)))
    }

    pub fn has_container(&self, name: &str) -> bool {
        self.state.lock().unwrap().containers.contains_key(name)
    }

    pub fn blob_data(&self, container: &str, name: &str) -> Option<Bytes> {
        let state = self.state.lock().unwrap();
        state
            .containers
            .get(container)?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, b)| b.data.clone())
    }

    fn record(&self, call: Call) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match &state.failure {
            Some(message) => Err(Error::StorageOperationFailed(message.clone())),
            None => Ok(()),
        }
    }

    fn put(&self, container: &str, name: &str, data: Bytes) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let blobs = state
            .containers
            .get_mut(container)
            .ok_or_else(|| Error::StorageOperationFailed("ContainerNotFound".into()))?;
        let blob = StoredBlob {
            data,
            last_modified: None,
            content_type: None,
        };
        match blobs.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = blob,
            None => blobs.push((name.to_string(), blob)),
        }
        Ok(())
    }
}

impl StorageClientFactory for MemoryStorage {
    fn container_client(
        &self,
        _config: &StorageConfig,
        container_name: &str,
    ) -> Result<Box<dyn BlobContainer>> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(Call::Connect(container_name.to_string()));
        Ok(Box::new(MemoryContainer {
            storage: self.clone(),
            name: container_name.to_string(),
        }))
    }
}

struct MemoryContainer {
    storage: MemoryStorage,
    name: String,
}

#[async_trait]
impl BlobContainer for MemoryContainer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self) -> Result<bool> {
        self.storage.record(Call::ContainerExists(self.name.clone()))?;
        Ok(self.storage.has_container(&self.name))
    }

    async fn create_if_not_exists(&self) -> Result<()> {
        self.storage.record(Call::CreateContainer(self.name.clone()))?;
        self.storage
            .state
            .lock()
            .unwrap()
            .containers
            .entry(self.name.clone())
            .or_default();
        Ok(())
    }

    async fn list_blobs(&self) -> Result<Vec<BlobMetadata>> {
        self.storage.record(Call::ListBlobs(self.name.clone()))?;
        let state = self.storage.state.lock().unwrap();
        let blobs = state.containers.get(&self.name).cloned().unwrap_or_default();
        Ok(blobs
            .into_iter()
            .map(|(name, blob)| BlobMetadata {
                name,
                size: Some(blob.data.len() as u64),
                last_modified: blob.last_modified,
                content_type: blob.content_type,
            })
            .collect())
    }

    fn blob(&self, blob_name: &str) -> Box<dyn BlobHandle> {
        Box::new(MemoryBlob {
            storage: self.storage.clone(),
            container: self.name.clone(),
            name: blob_name.to_string(),
        })
    }
}

struct MemoryBlob {
    storage: MemoryStorage,
    container: String,
    name: String,
}

impl MemoryBlob {
    fn data(&self) -> Result<Bytes> {
        self.storage
            .blob_data(&self.container, &self.name)
            .ok_or_else(|| Error::StorageOperationFailed("BlobNotFound".into()))
    }

    fn chunks(&self) -> Result<ChunkStream> {
        let data = self.data()?;
        let (size, stream_failure) = {
            let state = self.storage.state.lock().unwrap();
            (state.chunk_size.unwrap_or(data.len().max(1)), state.stream_failure.clone())
        };

        let mut chunks: Vec<Result<Bytes>> = data
            .chunks(size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        if let Some(message) = stream_failure {
            chunks.truncate(1);
            chunks.push(Err(Error::StorageOperationFailed(message)));
        }
        Ok(futures::stream::iter(chunks).boxed())
    }
}

#[async_trait]
impl BlobHandle for MemoryBlob {
    fn url(&self) -> Result<String> {
        Ok(format!("memory://{}/{}", self.container, self.name))
    }

    async fn exists(&self) -> Result<bool> {
        self.storage.record(Call::BlobExists(self.name.clone()))?;
        Ok(self.storage.blob_data(&self.container, &self.name).is_some())
    }

    async fn upload_file(&self, path: &Path) -> Result<()> {
        self.storage
            .record(Call::UploadFile(self.name.clone(), path.to_path_buf()))?;
        let data = tokio::fs::read(path).await?;
        self.storage.put(&self.container, &self.name, Bytes::from(data))
    }

    async fn upload_bytes(&self, data: Bytes) -> Result<()> {
        self.storage
            .record(Call::UploadBytes(self.name.clone(), data.len()))?;
        self.storage.put(&self.container, &self.name, data)
    }

    async fn download_to_file(&self, path: &Path) -> Result<()> {
        self.storage
            .record(Call::DownloadToFile(self.name.clone(), path.to_path_buf()))?;
        write_atomically(path, self.chunks()?).await
    }

    async fn download_stream(&self) -> Result<ChunkStream> {
        self.storage
            .record(Call::DownloadStream(self.name.clone()))?;
        self.chunks()
    }
}
