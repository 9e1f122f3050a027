//! # Animation 模块
//!
//! 通用动画时间轴，负责管理所有正在播放的属性动画。
//!
//! ## 核心设计理念
//!
//! 动画系统只负责 **时间轴管理**：
//! - 知道某个元素的某个属性从 A 经过若干关键帧到 B
//! - 按绝对时间采样当前值，不累积帧间隔误差
//! - **不接触渲染表面**，Host 把 [`FrameOutput::writes`] 写回自己的元素
//!
//! ```rust,ignore
//! let mut system = AnimationSystem::new();
//! system.start(
//!     AnimKey::new(element, AnimProperty::Opacity),
//!     0.0,
//!     vec![Segment::new(1.0, 800)],
//!     EasingFunction::EaseOutCubic,
//!     now,
//! );
//!
//! let output = system.update(now + 16);
//! for (key, value) in output.writes {
//!     host.apply(key, value);
//! }
//! ```

use std::collections::BTreeMap;

use crate::easing::EasingFunction;
use crate::platform::{ElementId, Millis};
use crate::style::AnimProperty;

/// 动画 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(pub u64);

/// 动画键：元素 + 属性
///
/// 同一键上同时只存在一个动画，新动画会取代旧动画。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimKey {
    pub element: ElementId,
    pub property: AnimProperty,
}

impl AnimKey {
    pub fn new(element: ElementId, property: AnimProperty) -> Self {
        Self { element, property }
    }
}

/// 关键帧段：在 `duration` 内从上一段终点变化到 `to`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub to: f32,
    pub duration: Millis,
}

impl Segment {
    pub fn new(to: f32, duration: Millis) -> Self {
        Self { to, duration }
    }
}

/// 动画状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationState {
    /// 等待开始（有延迟）
    #[default]
    Pending,
    /// 正在播放
    Playing,
    /// 已完成
    Completed,
    /// 已取消
    Cancelled,
}

impl AnimationState {
    /// 是否为活跃状态（需要更新）
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Playing)
    }

    /// 是否已结束
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// 单个属性动画
#[derive(Debug, Clone)]
pub struct Animation {
    pub id: AnimationId,
    pub key: AnimKey,
    /// 起始值
    pub from: f32,
    /// 关键帧段（至少一段）
    pub segments: Vec<Segment>,
    /// 每段使用的缓动函数
    pub easing: EasingFunction,
    /// 开始播放的绝对时间（已包含延迟）
    pub start: Millis,
    pub state: AnimationState,
    value: f32,
}

impl Animation {
    pub fn new(
        id: AnimationId,
        key: AnimKey,
        from: f32,
        segments: Vec<Segment>,
        easing: EasingFunction,
        start: Millis,
    ) -> Self {
        Self {
            id,
            key,
            from,
            segments,
            easing,
            start,
            state: AnimationState::Pending,
            value: from,
        }
    }

    /// 总时长
    pub fn duration(&self) -> Millis {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// 结束时间
    pub fn end(&self) -> Millis {
        self.start + self.duration()
    }

    /// 最终值
    pub fn final_value(&self) -> f32 {
        self.segments.last().map_or(self.from, |s| s.to)
    }

    /// 当前值
    pub fn current_value(&self) -> f32 {
        self.value
    }

    /// 按绝对时间采样
    ///
    /// # 返回
    /// - `true`: 动画仍在进行中
    /// - `false`: 动画已结束
    pub fn sample(&mut self, now: Millis) -> bool {
        if self.state.is_finished() {
            return false;
        }

        if now < self.start {
            self.state = AnimationState::Pending;
            self.value = self.from;
            return true;
        }

        let elapsed = now - self.start;
        if elapsed >= self.duration() {
            self.value = self.final_value();
            self.state = AnimationState::Completed;
            return false;
        }

        self.state = AnimationState::Playing;
        let mut segment_start = 0;
        let mut segment_from = self.from;
        for segment in &self.segments {
            let segment_end = segment_start + segment.duration;
            if elapsed < segment_end {
                let t = (elapsed - segment_start) as f32 / segment.duration as f32;
                let eased = self.easing.apply(t);
                self.value = segment_from + (segment.to - segment_from) * eased;
                return true;
            }
            segment_start = segment_end;
            segment_from = segment.to;
        }

        self.value = self.final_value();
        true
    }

    /// 取消
    pub fn cancel(&mut self) {
        if self.state.is_active() {
            self.state = AnimationState::Cancelled;
        }
    }
}

/// 动画事件
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationEvent {
    /// 动画完成
    Completed(AnimationId),
    /// 动画被取消（包括被同键新动画取代）
    Cancelled(AnimationId),
}

/// 一次更新的输出
#[derive(Debug, Clone, Default)]
pub struct FrameOutput {
    /// 需要写回元素的属性值（包括本帧刚完成的动画终值）
    pub writes: Vec<(AnimKey, f32)>,
    /// 本帧产生的事件
    pub events: Vec<AnimationEvent>,
}

/// 动画系统
///
/// 管理所有动画实例，提供统一的更新和查询接口。
#[derive(Debug, Default)]
pub struct AnimationSystem {
    animations: BTreeMap<AnimKey, Animation>,
    next_id: u64,
    /// 待处理的事件队列
    events: Vec<AnimationEvent>,
}

impl AnimationSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_animation_id(&mut self) -> AnimationId {
        self.next_id += 1;
        AnimationId(self.next_id)
    }

    /// 启动动画
    ///
    /// 同一键上已有的动画会被取消并产生 `Cancelled` 事件。
    pub fn start(
        &mut self,
        key: AnimKey,
        from: f32,
        segments: Vec<Segment>,
        easing: EasingFunction,
        start: Millis,
    ) -> AnimationId {
        let id = self.next_animation_id();
        let animation = Animation::new(id, key, from, segments, easing, start);

        if let Some(previous) = self.animations.insert(key, animation) {
            self.events.push(AnimationEvent::Cancelled(previous.id));
        }
        id
    }

    /// 取消单个动画
    pub fn cancel(&mut self, id: AnimationId) -> bool {
        let key = self
            .animations
            .iter()
            .find(|(_, anim)| anim.id == id)
            .map(|(key, _)| *key);

        match key.and_then(|key| self.animations.remove(&key)) {
            Some(_) => {
                self.events.push(AnimationEvent::Cancelled(id));
                true
            }
            None => false,
        }
    }

    /// 取消元素上的全部动画（元素被移除时调用）
    pub fn cancel_element(&mut self, element: ElementId) {
        let events = &mut self.events;
        self.animations.retain(|key, anim| {
            if key.element == element {
                events.push(AnimationEvent::Cancelled(anim.id));
                false
            } else {
                true
            }
        });
    }

    /// 按绝对时间更新所有动画
    pub fn update(&mut self, now: Millis) -> FrameOutput {
        let mut output = FrameOutput::default();
        let mut completed = Vec::new();

        for (key, animation) in &mut self.animations {
            if !animation.sample(now) {
                completed.push(*key);
            }
            output.writes.push((*key, animation.current_value()));
        }

        for key in completed {
            if let Some(animation) = self.animations.remove(&key) {
                self.events.push(AnimationEvent::Completed(animation.id));
            }
        }

        output.events = std::mem::take(&mut self.events);
        output
    }

    /// 取走尚未随 `update` 返回的事件
    pub fn drain_events(&mut self) -> Vec<AnimationEvent> {
        std::mem::take(&mut self.events)
    }

    /// 查询当前值
    pub fn value(&self, key: &AnimKey) -> Option<f32> {
        self.animations.get(key).map(|a| a.current_value())
    }

    /// 是否还有动画
    pub fn is_idle(&self) -> bool {
        self.animations.is_empty()
    }

    /// 动画数量
    pub fn active_count(&self) -> usize {
        self.animations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: u64) -> AnimKey {
        AnimKey::new(ElementId(id), AnimProperty::Opacity)
    }

    #[test]
    fn test_animation_sample() {
        let mut anim = Animation::new(
            AnimationId(1),
            key(1),
            0.0,
            vec![Segment::new(1.0, 100)],
            EasingFunction::Linear,
            1000,
        );

        // 延迟期间
        assert!(anim.sample(900));
        assert_eq!(anim.state, AnimationState::Pending);
        assert_eq!(anim.current_value(), 0.0);

        assert!(anim.sample(1050));
        assert_eq!(anim.state, AnimationState::Playing);
        assert!((anim.current_value() - 0.5).abs() < 1e-6);

        // 完成
        assert!(!anim.sample(1100));
        assert_eq!(anim.state, AnimationState::Completed);
        assert_eq!(anim.current_value(), 1.0);
    }

    #[test]
    fn test_keyframe_segments() {
        let mut anim = Animation::new(
            AnimationId(1),
            key(1),
            0.0,
            vec![
                Segment::new(-10.0, 50),
                Segment::new(10.0, 50),
                Segment::new(0.0, 50),
            ],
            EasingFunction::Linear,
            0,
        );
        assert_eq!(anim.duration(), 150);

        anim.sample(25);
        assert!((anim.current_value() + 5.0).abs() < 1e-4);
        anim.sample(75);
        assert!(anim.current_value().abs() < 1e-4);
        anim.sample(140);
        assert!((anim.current_value() - 2.0).abs() < 1e-4);
        assert!(!anim.sample(150));
        assert_eq!(anim.current_value(), 0.0);
    }

    #[test]
    fn test_zero_duration_completes_immediately() {
        let mut anim = Animation::new(
            AnimationId(1),
            key(1),
            0.0,
            vec![Segment::new(1.0, 0)],
            EasingFunction::Linear,
            10,
        );
        assert!(!anim.sample(10));
        assert_eq!(anim.current_value(), 1.0);
    }

    #[test]
    fn test_system_update_and_complete() {
        let mut system = AnimationSystem::new();
        let id = system.start(
            key(1),
            0.0,
            vec![Segment::new(1.0, 100)],
            EasingFunction::Linear,
            0,
        );

        let output = system.update(50);
        assert_eq!(output.writes.len(), 1);
        assert!(output.events.is_empty());

        let output = system.update(100);
        assert_eq!(output.writes, vec![(key(1), 1.0)]);
        assert_eq!(output.events, vec![AnimationEvent::Completed(id)]);
        assert!(system.is_idle());
    }

    #[test]
    fn test_same_key_replaces() {
        let mut system = AnimationSystem::new();
        let first = system.start(
            key(1),
            0.0,
            vec![Segment::new(1.0, 100)],
            EasingFunction::Linear,
            0,
        );
        let second = system.start(
            key(1),
            1.0,
            vec![Segment::new(0.0, 100)],
            EasingFunction::Linear,
            0,
        );

        assert_eq!(system.active_count(), 1);
        let output = system.update(10);
        assert_eq!(output.events, vec![AnimationEvent::Cancelled(first)]);
        assert_ne!(first, second);
    }

    #[test]
    fn test_cancel_element() {
        let mut system = AnimationSystem::new();
        system.start(key(1), 0.0, vec![Segment::new(1.0, 100)], EasingFunction::Linear, 0);
        system.start(
            AnimKey::new(ElementId(1), AnimProperty::Rotate),
            0.0,
            vec![Segment::new(360.0, 100)],
            EasingFunction::Linear,
            0,
        );
        system.start(key(2), 0.0, vec![Segment::new(1.0, 100)], EasingFunction::Linear, 0);

        system.cancel_element(ElementId(1));
        assert_eq!(system.active_count(), 1);
        assert_eq!(system.drain_events().len(), 2);
    }
}
