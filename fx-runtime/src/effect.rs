//! # Effect 模块
//!
//! 视觉效果的声明式描述。
//!
//! ## 设计原则
//!
//! - **声明式**：`EffectSpec` 描述"做什么"，不描述"怎么做"
//! - **自包含**：每个效果自带清理语义（移除节点、清除滤镜），
//!   多个效果实例之间没有共享的可变状态
//! - **随机数前置**：彩纸粒子的随机参数在生成 `EffectSpec` 时就已确定，
//!   Host 只负责播放，因此效果在固定种子下完全可复现

use rand::Rng;
use serde::Serialize;

use crate::animation::Segment;
use crate::easing::EasingFunction;
use crate::platform::{ElementId, Millis};
use crate::style::AnimProperty;

/// 各效果的默认参数
///
/// 这些常量是效果参数的**唯一来源**。
pub mod defaults {
    use crate::platform::Millis;

    /// 揭示动画：进入时长
    pub const REVEAL_IN_DURATION: Millis = 800;
    /// 揭示动画：退出时长
    pub const REVEAL_OUT_DURATION: Millis = 600;
    /// 揭示动画：垂直位移（px）
    pub const REVEAL_OFFSET: f32 = 50.0;
    /// 逐字动画：单字时长
    pub const TEXT_CHAR_DURATION: Millis = 600;
    /// 逐字动画：垂直位移（px）
    pub const TEXT_CHAR_OFFSET: f32 = 20.0;
    /// 逐字动画：默认交错间隔
    pub const TEXT_STAGGER: Millis = 50;
    /// 抖动：单个关键帧时长
    pub const SHAKE_STEP: Millis = 50;
    /// 抖动：幅度（px）
    pub const SHAKE_DISTANCE: f32 = 10.0;
    /// 旋转时长
    pub const SPIN_DURATION: Millis = 600;
    /// 色相闪烁：步数
    pub const HUE_FLASH_STEPS: u32 = 6;
    /// 色相闪烁：步间隔
    pub const HUE_FLASH_INTERVAL: Millis = 100;
    /// 色相闪烁：每步角度
    pub const HUE_FLASH_DEGREES: f32 = 60.0;
    /// 彩纸容器的兜底移除时间
    pub const CONFETTI_CONTAINER_TTL: Millis = 4000;
    /// 彩纸落出视口底部的额外距离（px）
    pub const CONFETTI_OVERSHOOT: f64 = 50.0;
    /// 通知横幅：淡入/淡出时长
    pub const NOTIFICATION_FADE: Millis = 400;
    /// 通知横幅：停留时长
    pub const NOTIFICATION_HOLD: Millis = 2000;
    /// 通知横幅：垂直位移（px）
    pub const NOTIFICATION_OFFSET: f32 = 20.0;
}

/// 属性轨道的取值方式
#[derive(Debug, Clone, PartialEq)]
pub enum TrackValues {
    /// 起止值
    FromTo { from: f32, to: f32 },
    /// 关键帧（每帧自带时长，忽略 Tween 的总时长）
    Keyframes { from: f32, frames: Vec<Segment> },
}

/// 单个属性的动画轨道
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyTrack {
    pub property: AnimProperty,
    pub values: TrackValues,
}

impl PropertyTrack {
    /// 展开为起始值 + 关键帧段
    pub fn segments(&self, duration: Millis) -> (f32, Vec<Segment>) {
        match &self.values {
            TrackValues::FromTo { from, to } => (*from, vec![Segment::new(*to, duration)]),
            TrackValues::Keyframes { from, frames } => (*from, frames.clone()),
        }
    }
}

/// 启动延迟
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delay {
    #[default]
    None,
    /// 所有目标相同的延迟
    Fixed(Millis),
    /// 第 i 个目标延迟 `i * step`
    Stagger(Millis),
}

impl Delay {
    /// 第 `index` 个目标的延迟
    pub fn for_index(&self, index: usize) -> Millis {
        match self {
            Delay::None => 0,
            Delay::Fixed(ms) => *ms,
            Delay::Stagger(step) => step * index as Millis,
        }
    }
}

/// 动画结束后的处理
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Completion {
    /// 保留终值
    #[default]
    Keep,
    /// 移除所有目标节点
    RemoveTargets,
}

/// 补间动画
#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    pub targets: Vec<ElementId>,
    pub tracks: Vec<PropertyTrack>,
    pub duration: Millis,
    pub easing: EasingFunction,
    pub delay: Delay,
    pub completion: Completion,
}

impl Tween {
    /// 创建空轨道的补间
    pub fn new(targets: Vec<ElementId>, duration: Millis, easing: EasingFunction) -> Self {
        Self {
            targets,
            tracks: Vec::new(),
            duration,
            easing,
            delay: Delay::None,
            completion: Completion::Keep,
        }
    }

    /// 单目标补间
    pub fn single(target: ElementId, duration: Millis, easing: EasingFunction) -> Self {
        Self::new(vec![target], duration, easing)
    }

    /// 添加起止值轨道
    pub fn track(mut self, property: AnimProperty, from: f32, to: f32) -> Self {
        self.tracks.push(PropertyTrack {
            property,
            values: TrackValues::FromTo { from, to },
        });
        self
    }

    /// 添加关键帧轨道
    pub fn keyframes(mut self, property: AnimProperty, from: f32, frames: Vec<Segment>) -> Self {
        self.tracks.push(PropertyTrack {
            property,
            values: TrackValues::Keyframes { from, frames },
        });
        self
    }

    /// 设置延迟
    pub fn with_delay(mut self, delay: Delay) -> Self {
        self.delay = delay;
        self
    }

    /// 设置结束处理
    pub fn with_completion(mut self, completion: Completion) -> Self {
        self.completion = completion;
        self
    }

    /// 第 `index` 个目标从提交到结束的总时长
    pub fn total_duration(&self, index: usize) -> Millis {
        let longest = self
            .tracks
            .iter()
            .map(|t| t.segments(self.duration).1.iter().map(|s| s.duration).sum())
            .max()
            .unwrap_or(0);
        self.delay.for_index(index) + longest
    }
}

/// 单个彩纸粒子（随机参数已确定）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfettiParticle {
    /// 颜色（CSS 颜色值）
    pub color: String,
    /// 水平位置（视口宽度百分比）
    pub left_percent: f64,
    /// 水平漂移（px）
    pub drift_x: f32,
    /// 旋转角度（deg）
    pub rotate: f32,
    /// 下落时长
    pub duration: Millis,
    /// 启动延迟
    pub delay: Millis,
}

impl ConfettiParticle {
    /// 粒子下落动画，`fall_distance` 由 Host 根据视口高度给出
    pub fn tween(&self, node: ElementId, fall_distance: f32) -> Tween {
        Tween::single(node, self.duration, EasingFunction::EaseOutCubic)
            .track(AnimProperty::TranslateY, 0.0, fall_distance)
            .track(AnimProperty::TranslateX, 0.0, self.drift_x)
            .track(AnimProperty::Rotate, 0.0, self.rotate)
            .track(AnimProperty::Opacity, 1.0, 0.0)
            .with_delay(Delay::Fixed(self.delay))
            .with_completion(Completion::RemoveTargets)
    }
}

/// 全屏彩纸爆发
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfettiBurst {
    pub particles: Vec<ConfettiParticle>,
    /// 容器兜底移除时间（与粒子完成无关）
    pub container_ttl: Millis,
    /// 落出视口底部的额外距离
    pub overshoot: f64,
}

impl ConfettiBurst {
    /// 随机生成
    ///
    /// 每个粒子：调色板中随机取色、水平位置 0–100%、漂移 ±200px、
    /// 旋转 0–720°、时长 2000–3000ms、延迟 0–200ms。
    pub fn generate<R: Rng>(
        count: usize,
        palette: &[String],
        container_ttl: Millis,
        rng: &mut R,
    ) -> Self {
        let particles = (0..count)
            .map(|_| {
                let color = if palette.is_empty() {
                    String::from("#ffffff")
                } else {
                    palette[rng.random_range(0..palette.len())].clone()
                };
                ConfettiParticle {
                    color,
                    left_percent: rng.random::<f64>() * 100.0,
                    drift_x: (rng.random::<f32>() - 0.5) * 400.0,
                    rotate: rng.random::<f32>() * 720.0,
                    duration: 2000 + (rng.random::<f64>() * 1000.0) as Millis,
                    delay: (rng.random::<f64>() * 200.0) as Millis,
                }
            })
            .collect();

        Self {
            particles,
            container_ttl,
            overshoot: defaults::CONFETTI_OVERSHOOT,
        }
    }
}

/// 定时通知横幅
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub message: String,
    pub fade_in: Millis,
    pub hold: Millis,
    pub fade_out: Millis,
}

impl Notification {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fade_in: defaults::NOTIFICATION_FADE,
            hold: defaults::NOTIFICATION_HOLD,
            fade_out: defaults::NOTIFICATION_FADE,
        }
    }

    /// 从出现到移除的总时长
    pub fn lifetime(&self) -> Millis {
        self.fade_in + self.hold + self.fade_out
    }

    /// 淡入
    pub fn enter(&self, node: ElementId) -> Tween {
        Tween::single(node, self.fade_in, EasingFunction::EaseOutCubic)
            .track(AnimProperty::Opacity, 0.0, 1.0)
            .track(AnimProperty::TranslateY, -defaults::NOTIFICATION_OFFSET, 0.0)
    }

    /// 淡出并移除
    pub fn exit(&self, node: ElementId) -> Tween {
        Tween::single(node, self.fade_out, EasingFunction::EaseInCubic)
            .track(AnimProperty::Opacity, 1.0, 0.0)
            .track(AnimProperty::TranslateY, 0.0, -defaults::NOTIFICATION_OFFSET)
            .with_completion(Completion::RemoveTargets)
    }
}

/// 色相闪烁：每隔 `interval` 写入 `hue-rotate(i * degrees)`，结束后清除滤镜
#[derive(Debug, Clone, PartialEq)]
pub struct HueFlash {
    pub target: ElementId,
    pub steps: u32,
    pub interval: Millis,
    pub degrees_per_step: f32,
}

impl HueFlash {
    pub fn new(target: ElementId) -> Self {
        Self {
            target,
            steps: defaults::HUE_FLASH_STEPS,
            interval: defaults::HUE_FLASH_INTERVAL,
            degrees_per_step: defaults::HUE_FLASH_DEGREES,
        }
    }

    /// 第 `step` 步的滤镜值
    pub fn filter_at(&self, step: u32) -> String {
        format!("hue-rotate({}deg)", step as f32 * self.degrees_per_step)
    }

    /// 总时长
    pub fn duration(&self) -> Millis {
        self.interval * self.steps as Millis
    }
}

/// 视觉效果描述
#[derive(Debug, Clone, PartialEq)]
pub enum EffectSpec {
    Tween(Tween),
    Confetti(ConfettiBurst),
    Notification(Notification),
    HueFlash(HueFlash),
}

impl EffectSpec {
    /// 效果名称（日志用）
    pub fn name(&self) -> &'static str {
        match self {
            EffectSpec::Tween(_) => "tween",
            EffectSpec::Confetti(_) => "confetti",
            EffectSpec::Notification(_) => "notification",
            EffectSpec::HueFlash(_) => "hue_flash",
        }
    }
}

/// 抖动：translateX -10 → 10 → -10 → 10 → 0，每帧 50ms
pub fn shake(target: ElementId) -> Tween {
    let d = defaults::SHAKE_DISTANCE;
    let step = defaults::SHAKE_STEP;
    Tween::single(target, step * 5, EasingFunction::EaseInOutQuad).keyframes(
        AnimProperty::TranslateX,
        0.0,
        vec![
            Segment::new(-d, step),
            Segment::new(d, step),
            Segment::new(-d, step),
            Segment::new(d, step),
            Segment::new(0.0, step),
        ],
    )
}

/// 旋转一周
pub fn spin(target: ElementId) -> Tween {
    Tween::single(
        target,
        defaults::SPIN_DURATION,
        EasingFunction::EaseInOutCubic,
    )
    .track(AnimProperty::Rotate, 0.0, 360.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn palette() -> Vec<String> {
        ["#0ea5e9", "#d946ef", "#06b6d4", "#8b5cf6", "#ec4899"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_delay_for_index() {
        assert_eq!(Delay::None.for_index(3), 0);
        assert_eq!(Delay::Fixed(120).for_index(3), 120);
        assert_eq!(Delay::Stagger(50).for_index(3), 150);
    }

    #[test]
    fn test_shake_is_250ms() {
        let tween = shake(ElementId(1));
        assert_eq!(tween.total_duration(0), 250);
        let (from, frames) = tween.tracks[0].segments(tween.duration);
        assert_eq!(from, 0.0);
        let values: Vec<f32> = frames.iter().map(|s| s.to).collect();
        assert_eq!(values, vec![-10.0, 10.0, -10.0, 10.0, 0.0]);
    }

    #[test]
    fn test_confetti_generation() {
        let mut rng = StdRng::seed_from_u64(7);
        let palette = palette();
        let burst = ConfettiBurst::generate(50, &palette, 4000, &mut rng);

        assert_eq!(burst.particles.len(), 50);
        assert_eq!(burst.container_ttl, 4000);
        for p in &burst.particles {
            assert!(palette.contains(&p.color));
            assert!((0.0..100.0).contains(&p.left_percent));
            assert!((-200.0..=200.0).contains(&p.drift_x));
            assert!((0.0..720.0).contains(&p.rotate));
            assert!((2000..3000).contains(&p.duration));
            assert!(p.delay < 200);
        }
    }

    #[test]
    fn test_confetti_is_reproducible() {
        let palette = palette();
        let a = ConfettiBurst::generate(10, &palette, 4000, &mut StdRng::seed_from_u64(1));
        let b = ConfettiBurst::generate(10, &palette, 4000, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_notification_lifetime() {
        let n = Notification::new("hi");
        assert_eq!(n.lifetime(), 2800);
        assert_eq!(n.exit(ElementId(1)).completion, Completion::RemoveTargets);
    }

    #[test]
    fn test_hue_flash_steps() {
        let flash = HueFlash::new(ElementId(1));
        assert_eq!(flash.duration(), 600);
        assert_eq!(flash.filter_at(0), "hue-rotate(0deg)");
        assert_eq!(flash.filter_at(5), "hue-rotate(300deg)");
    }
}
