//! # Config 模块
//!
//! 回放宿主的配置管理。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (fx-host.json)
//! 3. 默认值（最低）

use std::fs;
use std::path::Path;

use fx_runtime::{EasterEggConfig, Millis};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{HostError, HostResult};

/// 视口尺寸配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    #[serde(default = "default_viewport_width")]
    pub width: f64,

    #[serde(default = "default_viewport_height")]
    pub height: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: default_viewport_width(),
            height: default_viewport_height(),
        }
    }
}

/// 宿主配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// 帧间隔（虚拟毫秒）
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: Millis,

    /// 彩纸随机种子
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// 最后一个事件之后继续推进的时长
    ///
    /// 场景显式给出 `until` 时忽略。
    #[serde(default = "default_settle_ms")]
    pub settle_ms: Millis,

    /// 场景未指定视口时使用
    #[serde(default)]
    pub viewport: ViewportConfig,

    /// 逐字动画间隔
    #[serde(default = "default_text_stagger_ms")]
    pub text_stagger_ms: Millis,

    /// 彩蛋配置
    #[serde(default)]
    pub easter_egg: EasterEggConfig,
}

// 默认值函数
fn default_frame_interval_ms() -> Millis {
    16
}

fn default_seed() -> u64 {
    42
}

fn default_settle_ms() -> Millis {
    5000
}

fn default_viewport_width() -> f64 {
    1280.0
}

fn default_viewport_height() -> f64 {
    800.0
}

fn default_text_stagger_ms() -> Millis {
    50
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
            seed: default_seed(),
            settle_ms: default_settle_ms(),
            viewport: ViewportConfig::default(),
            text_stagger_ms: default_text_stagger_ms(),
            easter_egg: EasterEggConfig::default(),
        }
    }
}

impl HostConfig {
    /// 从文件加载配置
    ///
    /// 文件不存在或解析失败时使用默认配置。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = ?path, "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    info!(path = ?path, "配置文件加载成功");
                    config
                }
                Err(e) => {
                    warn!(error = %e, "配置文件解析失败，使用默认配置");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "配置文件读取失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> HostResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| HostError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 验证配置有效性
    pub fn validate(&self) -> HostResult<()> {
        if self.frame_interval_ms == 0 {
            return Err(HostError::InvalidConfig("帧间隔必须大于 0".to_string()));
        }
        let ViewportConfig { width, height } = self.viewport;
        if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
            return Err(HostError::InvalidConfig(format!(
                "视口尺寸无效: {width}x{height}"
            )));
        }
        self.easter_egg.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HostConfig::default();
        assert_eq!(config.frame_interval_ms, 16);
        assert_eq!(config.seed, 42);
        assert_eq!(config.viewport.width, 1280.0);
        assert_eq!(config.text_stagger_ms, 50);
        assert_eq!(config.easter_egg.activate_at, 7);
    }

    #[test]
    fn test_config_serialization() {
        let config = HostConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: HostConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: HostConfig = serde_json::from_str(r#"{ "seed": 7 }"#).unwrap();
        assert_eq!(parsed.seed, 7);
        assert_eq!(parsed.frame_interval_ms, 16);
        assert_eq!(parsed.easter_egg.reset_gap_ms, 2000);
    }

    #[test]
    fn test_config_validation() {
        let mut config = HostConfig::default();
        assert!(config.validate().is_ok());

        config.frame_interval_ms = 0;
        assert!(config.validate().is_err());

        config.frame_interval_ms = 16;
        config.viewport.height = 0.0;
        assert!(config.validate().is_err());

        config.viewport.height = 800.0;
        config.easter_egg.palette.clear();
        assert!(matches!(config.validate(), Err(HostError::Options(_))));
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = HostConfig::load(dir.path().join("missing.json"));
        assert_eq!(config, HostConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fx-host.json");
        let config = HostConfig {
            seed: 99,
            ..HostConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(HostConfig::load(&path), config);
    }
}
