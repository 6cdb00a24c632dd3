use std::sync::Arc;

use crate::azure::AzureClientFactory;
use crate::config::{ConfigProvider, EnvConfigProvider, StorageConfig};
use crate::storage::{BlobContainer, StorageClientFactory};
use crate::Result;

/// 各操作に渡す依存関係（設定プロバイダーとクライアントファクトリ）
#[derive(Clone)]
pub struct ToolContext {
    config: Arc<dyn ConfigProvider>,
    storage: Arc<dyn StorageClientFactory>,
}

impl ToolContext {
    pub fn new(config: Arc<dyn ConfigProvider>, storage: Arc<dyn StorageClientFactory>) -> Self {
        Self { config, storage }
    }

    /// 環境変数 + Azure SDK の標準構成
    pub fn from_env() -> Self {
        Self::new(Arc::new(EnvConfigProvider::new()), Arc::new(AzureClientFactory))
    }

    /// 呼び出しごとに設定を読み直す
    pub fn resolve_config(&self) -> Result<StorageConfig> {
        self.config.get_config()
    }

    pub fn container_client(
        &self,
        config: &StorageConfig,
        container_name: &str,
    ) -> Result<Box<dyn BlobContainer>> {
        self.storage.container_client(config, container_name)
    }

    /// 設定を読み直してコンテナクライアントを作る
    pub fn connect(&self, container_name: &str) -> Result<Box<dyn BlobContainer>> {
        let config = self.resolve_config()?;
        self.container_client(&config, container_name)
    }
}
