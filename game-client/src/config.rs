//! 客户端配置
//!
//! JSON 文件持久化，默认位于 `<config_dir>/gth-client/config.json`。
//! 命令行参数覆盖文件中的值。

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use protocol::Side;
use serde::{Deserialize, Serialize};

/// 客户端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// 服务器主机名
    pub host: String,
    /// 逻辑端口偏移（实际端口 = 基础端口 + 偏移）
    pub server: u16,
    /// 请求的阵营
    pub side: Side,
    /// 对局记录保存路径
    pub record_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            server: 0,
            side: Side::White,
            record_path: None,
        }
    }
}

impl ClientConfig {
    /// 获取默认配置文件路径
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("gth-client");
            path.push("config.json");
            path
        })
    }

    /// 从默认位置加载，失败时使用默认配置
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            tracing::warn!("Cannot determine config directory, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{:#}, using defaults", e);
                Self::default()
            }
        }
    }

    /// 从指定文件加载
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {:?}", path))?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// 保存到指定文件
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = ClientConfig {
            host: "chess.example.org".to_string(),
            server: 3,
            side: Side::Black,
            record_path: Some(PathBuf::from("/tmp/game.json")),
        };
        config.save_to(&path).unwrap();

        let loaded = ClientConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "side": "black" }"#).unwrap();

        let loaded = ClientConfig::load_from(&path).unwrap();
        assert_eq!(loaded.side, Side::Black);
        assert_eq!(loaded.host, "localhost");
        assert_eq!(loaded.server, 0);
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        assert!(ClientConfig::load_from(&path).is_err());
        assert!(ClientConfig::load_from(&dir.path().join("missing.json")).is_err());
    }
}
