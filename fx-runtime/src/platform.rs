//! # Platform 模块
//!
//! 宿主平台能力接口。
//!
//! 组件不直接接触浏览器原语，而是通过三个能力接口与 Host 交互：
//!
//! - [`Scheduler`]：定时器与帧调度（setTimeout / requestAnimationFrame）
//! - [`IntersectionHost`]：元素相交观察（IntersectionObserver）
//! - [`EffectSurface`]：视觉副作用（样式写入、节点创建、动画播放）
//!
//! 定时器与帧回调由 Host 以 [`TimerId`] / [`FrameId`] 的形式回传给组件，
//! 组件自行判断是否属于自己（ID 全局唯一）。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::effect::EffectSpec;
use crate::geometry::RootMargin;

/// 毫秒时间戳 / 时长
pub type Millis = u64;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            /// 获取内部 ID 值
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

id_type!(
    /// 元素标识符（由 Host 分配）
    ElementId,
    "element"
);
id_type!(
    /// 定时器标识符
    TimerId,
    "timer"
);
id_type!(
    /// 帧请求标识符
    FrameId,
    "frame"
);
id_type!(
    /// 视觉效果句柄
    EffectHandle,
    "effect"
);

/// 定时器与帧调度
pub trait Scheduler {
    /// 当前时间
    fn now(&self) -> Millis;

    /// 注册一次性定时器，到期后 Host 以返回的 ID 回调组件
    fn set_timeout(&mut self, delay: Millis) -> TimerId;

    /// 取消定时器（对已触发或未知的 ID 无副作用）
    fn clear_timeout(&mut self, id: TimerId);

    /// 请求在下一次重绘前回调一次
    fn request_frame(&mut self) -> FrameId;

    /// 取消帧请求
    fn cancel_frame(&mut self, id: FrameId);
}

/// 观察请求参数
#[derive(Debug, Clone, PartialEq)]
pub struct ObserveRequest {
    /// 升序排列的阈值
    pub thresholds: Vec<f64>,
    /// 触发框扩展量
    pub root_margin: RootMargin,
}

/// 相交观察回调条目
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    /// 被观察的元素
    pub target: ElementId,
    /// 是否与视口（含 margin）相交
    pub is_intersecting: bool,
    /// 相交面积比例
    pub intersection_ratio: f64,
}

impl IntersectionEntry {
    pub fn new(target: ElementId, is_intersecting: bool, intersection_ratio: f64) -> Self {
        Self {
            target,
            is_intersecting,
            intersection_ratio,
        }
    }
}

/// 相交观察器（每个组件实例一个）
pub trait IntersectionHost {
    /// 开始观察元素
    fn observe(&mut self, target: ElementId, request: &ObserveRequest);

    /// 停止观察单个元素
    fn unobserve(&mut self, target: ElementId);

    /// 停止全部观察
    fn disconnect(&mut self);
}

/// 可写入的样式属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleProperty {
    Transform,
    Opacity,
    Filter,
    Display,
}

impl StyleProperty {
    /// CSS 属性名
    pub fn as_css(&self) -> &'static str {
        match self {
            StyleProperty::Transform => "transform",
            StyleProperty::Opacity => "opacity",
            StyleProperty::Filter => "filter",
            StyleProperty::Display => "display",
        }
    }
}

impl fmt::Display for StyleProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_css())
    }
}

/// 视觉副作用能力接口
///
/// 核心逻辑（计数、阈值、序列匹配）只通过此接口产生副作用，
/// 因此可以脱离任何真实渲染表面进行测试。
pub trait EffectSurface {
    /// 提交一个视觉效果，效果自行负责清理
    fn create_visual_effect(&mut self, spec: EffectSpec) -> EffectHandle;

    /// 取消效果并移除其创建的节点
    fn cancel(&mut self, handle: EffectHandle);

    /// 直接写入样式
    fn set_style(&mut self, target: ElementId, property: StyleProperty, value: &str);

    /// 读取元素文本内容
    fn text_content(&self, target: ElementId) -> Option<String>;

    /// 用每个字符一个子节点替换元素的全部子节点，返回新节点（按顺序）
    fn replace_with_chars(&mut self, target: ElementId, chars: &[String]) -> Vec<ElementId>;
}
