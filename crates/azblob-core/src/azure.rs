//! Azure Blob Storage クライアント
//!
//! `azure_storage_blobs` を `BlobContainer` / `BlobHandle` の背後に隠す。
//! 接続文字列は `azure_storage::ConnectionString` で分解し、
//! 独自クラウドや Azurite などのエミュレータにも対応する。

use std::path::Path;

use async_trait::async_trait;
use azure_core::tokio::fs::FileStreamBuilder;
use azure_core::Url;
use azure_storage::{CloudLocation, ConnectionString, EndpointProtocol, StorageCredentials};
use azure_storage_blobs::blob::Blob;
use azure_storage_blobs::prelude::*;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::storage::{BlobContainer, BlobHandle, BlobMetadata, ChunkStream, StorageClientFactory};
use crate::{Error, Result};

const PUBLIC_ENDPOINT_SUFFIX: &str = "core.windows.net";
const EMULATOR_PORT: u16 = 10000;

fn invalid(message: impl std::fmt::Display) -> Error {
    Error::ConfigurationMissing(format!("Invalid connection string: {}", message))
}

/// 接続文字列から SDK のクライアントビルダーを組み立てる
///
/// `BlobEndpoint` があればそのまま使い、無ければ `DefaultEndpointsProtocol` と
/// `EndpointSuffix` からエンドポイントを組み立てる。
pub fn client_builder(connection_string: &str) -> Result<ClientBuilder> {
    let parsed = ConnectionString::new(connection_string).map_err(invalid)?;

    if parsed.use_development_storage == Some(true) {
        return emulator_builder(parsed.development_storage_proxy_uri);
    }

    let account = resolve_account(&parsed)?;
    let credentials = parsed
        .storage_credentials()
        .map_err(|_| invalid("missing AccountKey or SharedAccessSignature"))?;
    let location = cloud_location(&parsed, &account)?;

    debug!("Using storage account {}", account);
    Ok(ClientBuilder::with_location(location, credentials))
}

fn emulator_builder(proxy_uri: Option<&str>) -> Result<ClientBuilder> {
    let Some(proxy) = proxy_uri else {
        return Ok(ClientBuilder::emulator());
    };

    let url = parse_endpoint(proxy)?;
    let location = CloudLocation::Emulator {
        address: url.host_str().unwrap_or("127.0.0.1").to_string(),
        port: url.port().unwrap_or(EMULATOR_PORT),
    };
    Ok(ClientBuilder::with_location(location, StorageCredentials::emulator()))
}

/// アカウント名（未指定なら BlobEndpoint のホスト名先頭から推定）
fn resolve_account(parsed: &ConnectionString) -> Result<String> {
    if let Some(name) = parsed.account_name {
        return Ok(name.to_string());
    }

    parsed
        .blob_endpoint
        .and_then(|endpoint| Url::parse(endpoint).ok())
        .and_then(|url| url.host_str().and_then(|h| h.split('.').next()).map(str::to_string))
        .ok_or_else(|| invalid("missing AccountName"))
}

fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint)
        .map_err(|e| Error::ConfigurationMissing(format!("Invalid endpoint {}: {}", endpoint, e)))?;
    if url.host_str().is_none() {
        return Err(Error::ConfigurationMissing(format!(
            "Invalid endpoint {}: missing host",
            endpoint
        )));
    }
    Ok(url)
}

/// 接続先を決める（BlobEndpoint はパスも含めてそのまま使う）
fn cloud_location(parsed: &ConnectionString, account: &str) -> Result<CloudLocation> {
    if let Some(endpoint) = parsed.blob_endpoint {
        parse_endpoint(endpoint)?;
        return Ok(CloudLocation::Custom {
            account: account.to_string(),
            uri: endpoint.trim_end_matches('/').to_string(),
        });
    }

    let protocol = match &parsed.default_endpoints_protocol {
        Some(EndpointProtocol::Http) => "http",
        _ => "https",
    };

    match parsed.endpoint_suffix {
        None if protocol == "https" => Ok(CloudLocation::Public {
            account: account.to_string(),
        }),
        suffix => Ok(CloudLocation::Custom {
            account: account.to_string(),
            uri: format!(
                "{}://{}.blob.{}",
                protocol,
                account,
                suffix.unwrap_or(PUBLIC_ENDPOINT_SUFFIX).trim_matches('.')
            ),
        }),
    }
}

fn metadata_from(blob: &Blob) -> BlobMetadata {
    let properties = &blob.properties;
    let modified = properties.last_modified;

    BlobMetadata {
        name: blob.name.clone(),
        size: Some(properties.content_length),
        last_modified: DateTime::<Utc>::from_timestamp(
            modified.unix_timestamp(),
            modified.nanosecond(),
        ),
        content_type: Some(properties.content_type.clone()).filter(|ct| !ct.is_empty()),
    }
}

/// 接続文字列から Azure のコンテナクライアントを作る
#[derive(Debug, Clone, Copy, Default)]
pub struct AzureClientFactory;

impl StorageClientFactory for AzureClientFactory {
    fn container_client(
        &self,
        config: &StorageConfig,
        container_name: &str,
    ) -> Result<Box<dyn BlobContainer>> {
        let client =
            client_builder(&config.connection_string)?.container_client(container_name.to_string());

        Ok(Box::new(AzureContainer {
            name: container_name.to_string(),
            client,
        }))
    }
}

pub struct AzureContainer {
    name: String,
    client: ContainerClient,
}

#[async_trait]
impl BlobContainer for AzureContainer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self) -> Result<bool> {
        debug!("Checking existence of container {}", self.name);
        Ok(self.client.exists().await?)
    }

    async fn create_if_not_exists(&self) -> Result<()> {
        if self.client.exists().await? {
            debug!("Container {} already exists", self.name);
            return Ok(());
        }

        match self.client.create().await {
            Ok(_) => {
                info!("Created container {}", self.name);
                Ok(())
            }
            // 並行して作成された場合
            Err(e) if e.to_string().contains("ContainerAlreadyExists") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_blobs(&self) -> Result<Vec<BlobMetadata>> {
        let mut pages = self.client.list_blobs().into_stream();
        let mut blobs = Vec::new();

        while let Some(page) = pages.try_next().await? {
            blobs.extend(page.blobs.blobs().map(metadata_from));
        }

        debug!("Found {} blobs in container {}", blobs.len(), self.name);
        Ok(blobs)
    }

    fn blob(&self, blob_name: &str) -> Box<dyn BlobHandle> {
        Box::new(AzureBlob {
            client: self.client.blob_client(blob_name.to_string()),
        })
    }
}

pub struct AzureBlob {
    client: BlobClient,
}

#[async_trait]
impl BlobHandle for AzureBlob {
    fn url(&self) -> Result<String> {
        Ok(self.client.url()?.to_string())
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.client.exists().await?)
    }

    async fn upload_file(&self, path: &Path) -> Result<()> {
        let file = tokio::fs::File::open(path).await?;
        let body = FileStreamBuilder::new(file).build().await?;
        debug!("Uploading {} ({} bytes)", path.display(), body.stream_size);
        self.client.put_block_blob(body).await?;
        Ok(())
    }

    async fn upload_bytes(&self, data: Bytes) -> Result<()> {
        debug!("Uploading {} bytes", data.len());
        self.client.put_block_blob(data).await?;
        Ok(())
    }

    async fn download_stream(&self) -> Result<ChunkStream> {
        let chunks = self
            .client
            .get()
            .into_stream()
            .map_err(Error::from)
            .and_then(|response| async move { response.data.collect().await.map_err(Error::from) });

        Ok(chunks.boxed())
    }
}
