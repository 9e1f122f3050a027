//! # Error 模块
//!
//! 定义 fx-runtime 中使用的错误类型。
//!
//! 组件操作本身不会失败（缺少前置条件时静默跳过），
//! 错误只出现在选项解析与校验这一层。

use thiserror::Error;

/// 选项解析/校验错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FxError {
    /// 无效的 rootMargin 语法
    #[error("无效的 rootMargin '{input}'：{message}")]
    InvalidRootMargin { input: String, message: String },

    /// 阈值超出范围
    #[error("阈值 {value} 超出范围，必须在 0.0 - 1.0 之间")]
    ThresholdOutOfRange { value: f64 },

    /// 阈值列表为空
    #[error("阈值列表不能为空")]
    EmptyThreshold,

    /// 选项值无效
    #[error("选项 '{name}' 的值无效：{message}")]
    InvalidOption { name: &'static str, message: String },
}

impl FxError {
    /// 创建选项错误
    pub fn invalid_option(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            name,
            message: message.into(),
        }
    }
}

/// Result 类型别名
pub type FxResult<T> = Result<T, FxError>;

/// 校验浮点选项是有限值
pub(crate) fn ensure_finite(name: &'static str, value: f64) -> FxResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(FxError::invalid_option(name, format!("{value} 不是有限数值")))
    }
}
