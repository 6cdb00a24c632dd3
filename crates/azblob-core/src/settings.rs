use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;

/// CLI 設定（~/.azblob/config.toml）
///
/// 接続文字列はここには保存しない。環境変数のみから読み込む。
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Settings {
    /// `--container` 省略時に使うコンテナ名
    pub default_container: Option<String>,
    /// ログレベル（RUST_LOG 未設定時に使用）
    pub log_level: Option<String>,
}

impl Settings {
    /// 設定ファイルのパスを取得
    pub fn config_path() -> Result<PathBuf> {
        let home = env::var("HOME")
            .map_err(|_| crate::Error::Config("HOME environment variable not set".into()))?;
        Ok(PathBuf::from(home).join(".azblob").join("config.toml"))
    }

    /// 設定を読み込み
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// 指定パスから設定を読み込み（存在しなければデフォルト）
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            crate::Error::Config(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config file: {}", e)))
    }

    /// 設定を保存
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                crate::Error::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            crate::Error::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content).map_err(|e| {
            crate::Error::Config(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// コンテナ名を解決（引数優先、なければデフォルト）
    pub fn resolve_container(&self, explicit: Option<String>) -> Result<String> {
        explicit
            .or_else(|| self.default_container.clone())
            .ok_or_else(|| {
                crate::Error::InvalidArgument(
                    "No container given and no default_container configured".into(),
                )
            })
    }
}
