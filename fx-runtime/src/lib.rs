//! # FX Runtime
//!
//! 作品集页面滚动/交互效果引擎的核心库。
//!
//! ## 架构概述
//!
//! `fx-runtime` 是纯逻辑核心，不依赖任何 DOM 或渲染引擎。
//! 组件通过 **能力接口** 与宿主层（Host）通信：
//!
//! ```text
//! Host                                   Runtime 组件
//!   │                                        │
//!   │──── 事件（滚动 / 指针 / 按键 / 点击）───►│
//!   │──── 相交条目 / 定时器 / 帧回调 ─────────►│
//!   │                                        │
//!   │◄─── Scheduler（定时器、帧请求）──────────│
//!   │◄─── IntersectionHost（observe）─────────│
//!   │◄─── EffectSurface（EffectSpec、样式）───│
//! ```
//!
//! ## 组件
//!
//! - [`VisibilityTracker`] / [`MultiVisibilityTracker`]：元素可见性
//! - [`ScrollParallax`] / [`ScrollProgress`] / [`MouseParallax`] / [`MultiLayerParallax`]：滚动采样
//! - [`RevealAnimator`] / [`TextStagger`]：揭示动画
//! - [`EasterEggTrigger`]：点击彩蛋与 Konami 序列
//!
//! 四类组件互不依赖，每个实例独占自己的状态。
//!
//! ## 模块结构
//!
//! - [`platform`]：能力接口与 ID 类型
//! - [`geometry`]：矩形、视口、rootMargin
//! - [`effect`]：视觉效果描述
//! - [`animation`]：动画时间轴
//! - [`player`]：效果播放器（供 Host 复用）
//! - [`error`]：错误类型定义

pub mod animation;
pub mod coalesce;
pub mod easing;
pub mod easter_egg;
pub mod effect;
pub mod error;
pub mod geometry;
pub mod observable;
pub mod platform;
pub mod player;
pub mod reveal;
pub mod scroll;
pub mod style;
pub mod visibility;

#[cfg(test)]
mod testing;

// 重导出核心类型
pub use animation::{AnimKey, AnimationEvent, AnimationId, AnimationSystem, Segment};
pub use coalesce::FrameCoalescer;
pub use easing::EasingFunction;
pub use easter_egg::{ClickOutcome, EasterEggConfig, EasterEggTrigger, KONAMI_CODE, KonamiMatcher};
pub use effect::{
    Completion, ConfettiBurst, ConfettiParticle, Delay, EffectSpec, HueFlash, Notification, Tween,
};
pub use error::{FxError, FxResult};
pub use geometry::{MarginValue, Point, Rect, RootMargin, Viewport};
pub use observable::Observable;
pub use platform::{
    EffectHandle, EffectSurface, ElementId, FrameId, IntersectionEntry, IntersectionHost, Millis,
    ObserveRequest, Scheduler, StyleProperty, TimerId,
};
pub use player::{DomOps, EffectPlayer, NodeKind, PlayerSurface};
pub use reveal::{RevealAnimator, RevealOptions, TextStagger};
pub use scroll::{
    LayerId, MouseParallax, MultiLayerParallax, ParallaxDirection, ParallaxOptions, ScrollParallax,
    ScrollProgress,
};
pub use style::{AnimProperty, StyleState};
pub use visibility::{
    MultiVisibilityTracker, ObservationState, Threshold, VisibilityOptions, VisibilityTracker,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        // 验证所有公共类型都可以正常使用
        let _options = VisibilityOptions::default();
        let _parallax = ParallaxOptions::default();
        let _config = EasterEggConfig::default();
        let _spec = EffectSpec::Tween(effect::spin(ElementId(1)));
        let _viewport = Viewport::default();
    }
}
