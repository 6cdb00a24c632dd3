use std::env;

use crate::Result;

/// 接続文字列を保持する環境変数名
pub const CONNECTION_STRING_ENV: &str = "AZURE_STORAGE_CONNECTION_STRING";

/// ストレージ接続設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub connection_string: String,
}

/// 呼び出しごとに設定を解決するプロバイダー
pub trait ConfigProvider: Send + Sync {
    fn get_config(&self) -> Result<StorageConfig>;
}

/// 環境変数から接続文字列を読み込むプロバイダー
///
/// キャッシュは持たず、`get_config` のたびに環境変数を読み直す。
#[derive(Debug, Clone)]
pub struct EnvConfigProvider {
    var: String,
}

impl EnvConfigProvider {
    pub fn new() -> Self {
        Self::with_var(CONNECTION_STRING_ENV)
    }

    /// 読み込む環境変数名を指定して作成
    pub fn with_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl Default for EnvConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_config(&self) -> Result<StorageConfig> {
        match env::var(&self.var) {
            Ok(connection_string) if !connection_string.is_empty() => {
                Ok(StorageConfig { connection_string })
            }
            _ => Err(crate::Error::ConfigurationMissing(format!(
                "{} environment variable is not set",
                self.var
            ))),
        }
    }
}

/// 固定の設定を返すプロバイダー（組み込み用途・テスト用）
#[derive(Debug, Clone)]
pub struct StaticConfigProvider {
    config: StorageConfig,
}

impl StaticConfigProvider {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            config: StorageConfig {
                connection_string: connection_string.into(),
            },
        }
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn get_config(&self) -> Result<StorageConfig> {
        Ok(self.config.clone())
    }
}
