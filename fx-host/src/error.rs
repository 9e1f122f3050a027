//! # Error 模块
//!
//! Host 层错误类型。

use std::path::PathBuf;

use fx_runtime::FxError;
use thiserror::Error;

/// Host 错误
#[derive(Error, Debug)]
pub enum HostError {
    /// 文件读写失败
    #[error("文件 IO 失败 {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON 解析失败
    #[error("JSON 解析失败 {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON 序列化 / 反序列化失败
    #[error("JSON 处理失败: {0}")]
    Serde(#[from] serde_json::Error),

    /// 配置验证失败
    #[error("配置验证失败: {0}")]
    InvalidConfig(String),

    /// 场景验证失败
    #[error("场景 '{scenario}' 无效: {message}")]
    InvalidScenario { scenario: String, message: String },

    /// 组件选项无效
    #[error(transparent)]
    Options(#[from] FxError),
}

impl HostError {
    pub(crate) fn scenario(scenario: &str, message: impl Into<String>) -> Self {
        Self::InvalidScenario {
            scenario: scenario.to_string(),
            message: message.into(),
        }
    }
}

/// Result 类型别名
pub type HostResult<T> = Result<T, HostError>;
