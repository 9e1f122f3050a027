//! # Player 模块
//!
//! 效果播放器：把 [`EffectSpec`] 变成节点创建、动画时间轴和定时任务。
//!
//! ## 职责划分
//!
//! - 播放器拥有动画时间轴和每个元素的样式状态
//! - Host 实现 [`DomOps`]，只负责真正的节点增删和样式写入
//! - Host 在每一帧调用 [`EffectPlayer::advance`]
//!
//! 每个效果自带清理：彩纸粒子完成后移除自身，彩纸容器在固定时间后移除，
//! 通知横幅淡出后移除。不同效果之间不共享任何可变状态。

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::animation::{AnimKey, AnimationEvent, AnimationId, AnimationSystem};
use crate::effect::{Completion, ConfettiBurst, EffectSpec, HueFlash, Notification, Tween};
use crate::platform::{EffectHandle, EffectSurface, ElementId, Millis, StyleProperty};
use crate::style::{AnimProperty, StyleState};

/// 效果创建的节点类型
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// 全屏彩纸容器
    ConfettiContainer,
    /// 单个彩纸粒子
    ConfettiParticle { color: String, left_percent: f64 },
    /// 通知横幅
    Notification { message: String },
}

/// Host 提供的最小 DOM 操作集
pub trait DomOps {
    /// 创建节点，`parent` 为 `None` 时挂到文档根部
    fn create_node(&mut self, kind: &NodeKind, parent: Option<ElementId>) -> ElementId;

    /// 移除节点（连同子节点）；对已移除的节点无副作用
    fn remove_node(&mut self, node: ElementId);

    /// 写入样式，空字符串表示清除
    fn write_style(&mut self, node: ElementId, property: StyleProperty, value: &str);

    /// 读取文本内容
    fn text_content(&self, node: ElementId) -> Option<String>;

    /// 用单字节点替换全部子节点
    fn replace_with_chars(&mut self, node: ElementId, chars: &[String]) -> Vec<ElementId>;

    /// 视口高度
    fn viewport_height(&self) -> f64;
}

/// 定时任务
#[derive(Debug, Clone)]
enum TaskKind {
    /// 移除节点（子节点在前）
    RemoveNodes(Vec<ElementId>),
    /// 写入色相滤镜
    SetHue { target: ElementId, degrees: f32 },
    /// 清除滤镜
    ClearFilter(ElementId),
    /// 开始补间
    StartTween(Tween),
}

impl TaskKind {
    /// 从任务中去掉节点；返回 `false` 表示任务已无目标
    fn forget(&mut self, node: ElementId) -> bool {
        match self {
            TaskKind::RemoveNodes(nodes) => {
                nodes.retain(|n| *n != node);
                !nodes.is_empty()
            }
            TaskKind::SetHue { target, .. } | TaskKind::ClearFilter(target) => *target != node,
            TaskKind::StartTween(tween) => {
                tween.targets.retain(|t| *t != node);
                !tween.targets.is_empty()
            }
        }
    }
}

#[derive(Debug, Clone)]
struct TimedTask {
    due: Millis,
    seq: u64,
    handle: EffectHandle,
    kind: TaskKind,
}

/// 效果记录
#[derive(Debug, Default)]
struct EffectRecord {
    name: &'static str,
    /// 效果自己创建的节点（取消时移除）
    owned_nodes: Vec<ElementId>,
    /// 每个目标尚未结束的动画数
    remaining: BTreeMap<ElementId, usize>,
    /// 动画结束后需要移除的目标
    remove_on_finish: BTreeSet<ElementId>,
    /// 尚未执行的定时任务数
    tasks: usize,
}

impl EffectRecord {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    fn is_finished(&self) -> bool {
        self.remaining.is_empty() && self.tasks == 0
    }
}

/// 效果播放器
#[derive(Debug, Default)]
pub struct EffectPlayer {
    animations: AnimationSystem,
    styles: BTreeMap<ElementId, StyleState>,
    effects: BTreeMap<EffectHandle, EffectRecord>,
    owners: BTreeMap<AnimationId, (EffectHandle, ElementId)>,
    tasks: Vec<TimedTask>,
    next_handle: u64,
    next_seq: u64,
}

impl EffectPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 提交效果
    pub fn play<D: DomOps + ?Sized>(
        &mut self,
        dom: &mut D,
        spec: EffectSpec,
        now: Millis,
    ) -> EffectHandle {
        self.next_handle += 1;
        let handle = EffectHandle(self.next_handle);
        self.effects.insert(handle, EffectRecord::new(spec.name()));
        debug!(effect = spec.name(), handle = %handle, "播放效果");

        match spec {
            EffectSpec::Tween(tween) => self.start_tween(handle, &tween, now),
            EffectSpec::Confetti(burst) => self.play_confetti(dom, handle, &burst, now),
            EffectSpec::Notification(notification) => {
                self.play_notification(dom, handle, &notification, now)
            }
            EffectSpec::HueFlash(flash) => self.play_hue_flash(handle, &flash, now),
        }

        self.collect_finished();
        handle
    }

    fn start_tween(&mut self, handle: EffectHandle, tween: &Tween, start: Millis) {
        let Some(record) = self.effects.get_mut(&handle) else {
            return;
        };
        for (index, target) in tween.targets.iter().enumerate() {
            let begin = start + tween.delay.for_index(index);
            for track in &tween.tracks {
                let (from, segments) = track.segments(tween.duration);
                let id = self.animations.start(
                    AnimKey::new(*target, track.property),
                    from,
                    segments,
                    tween.easing,
                    begin,
                );
                self.owners.insert(id, (handle, *target));
                *record.remaining.entry(*target).or_default() += 1;
            }
            if tween.completion == Completion::RemoveTargets {
                record.remove_on_finish.insert(*target);
            }
        }
    }

    fn play_confetti<D: DomOps + ?Sized>(
        &mut self,
        dom: &mut D,
        handle: EffectHandle,
        burst: &ConfettiBurst,
        now: Millis,
    ) {
        let container = dom.create_node(&NodeKind::ConfettiContainer, None);
        let fall = (dom.viewport_height() + burst.overshoot) as f32;

        let mut nodes = Vec::with_capacity(burst.particles.len() + 1);
        for particle in &burst.particles {
            let kind = NodeKind::ConfettiParticle {
                color: particle.color.clone(),
                left_percent: particle.left_percent,
            };
            let node = dom.create_node(&kind, Some(container));
            self.start_tween(handle, &particle.tween(node, fall), now);
            nodes.push(node);
        }
        nodes.push(container);

        if let Some(record) = self.effects.get_mut(&handle) {
            record.owned_nodes = nodes.clone();
        }
        // 容器按固定时间移除，与粒子是否完成无关
        self.schedule(handle, now + burst.container_ttl, TaskKind::RemoveNodes(nodes));
    }

    fn play_notification<D: DomOps + ?Sized>(
        &mut self,
        dom: &mut D,
        handle: EffectHandle,
        notification: &Notification,
        now: Millis,
    ) {
        let node = dom.create_node(
            &NodeKind::Notification {
                message: notification.message.clone(),
            },
            None,
        );
        dom.write_style(node, StyleProperty::Opacity, "0");
        if let Some(record) = self.effects.get_mut(&handle) {
            record.owned_nodes.push(node);
        }

        self.start_tween(handle, &notification.enter(node), now);
        self.schedule(
            handle,
            now + notification.fade_in + notification.hold,
            TaskKind::StartTween(notification.exit(node)),
        );
    }

    fn play_hue_flash(&mut self, handle: EffectHandle, flash: &HueFlash, now: Millis) {
        for step in 0..flash.steps {
            self.schedule(
                handle,
                now + flash.interval * (step as Millis + 1),
                TaskKind::SetHue {
                    target: flash.target,
                    degrees: step as f32 * flash.degrees_per_step,
                },
            );
        }
        self.schedule(
            handle,
            now + flash.duration(),
            TaskKind::ClearFilter(flash.target),
        );
    }

    fn schedule(&mut self, handle: EffectHandle, due: Millis, kind: TaskKind) {
        self.next_seq += 1;
        self.tasks.push(TimedTask {
            due,
            seq: self.next_seq,
            handle,
            kind,
        });
        if let Some(record) = self.effects.get_mut(&handle) {
            record.tasks += 1;
        }
    }

    /// 推进到 `now`：执行到期任务，采样动画并写回样式
    pub fn advance<D: DomOps + ?Sized>(&mut self, dom: &mut D, now: Millis) {
        while let Some(task) = self.pop_due(now) {
            if let Some(record) = self.effects.get_mut(&task.handle) {
                record.tasks = record.tasks.saturating_sub(1);
            }
            self.run_task(dom, task);
        }

        let output = self.animations.update(now);
        let mut touched = BTreeSet::new();
        for (key, value) in output.writes {
            self.styles.entry(key.element).or_default().set(key.property, value);
            touched.insert((key.element, key.property.style_property()));
        }
        for (element, property) in touched {
            self.flush_style(dom, element, property);
        }

        let mut removals = Vec::new();
        for event in output.events {
            let (id, completed) = match event {
                AnimationEvent::Completed(id) => (id, true),
                AnimationEvent::Cancelled(id) => (id, false),
            };
            let Some((handle, target)) = self.owners.remove(&id) else {
                continue;
            };
            let Some(record) = self.effects.get_mut(&handle) else {
                continue;
            };
            let Some(count) = record.remaining.get_mut(&target) else {
                continue;
            };
            *count = count.saturating_sub(1);
            if *count == 0 {
                record.remaining.remove(&target);
                if completed && record.remove_on_finish.contains(&target) {
                    removals.push(target);
                }
            }
        }
        if !removals.is_empty() {
            self.remove_nodes(dom, &removals);
        }

        self.collect_finished();
    }

    fn pop_due(&mut self, now: Millis) -> Option<TimedTask> {
        let index = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.due <= now)
            .min_by_key(|(_, task)| (task.due, task.seq))
            .map(|(index, _)| index)?;
        Some(self.tasks.swap_remove(index))
    }

    fn run_task<D: DomOps + ?Sized>(&mut self, dom: &mut D, task: TimedTask) {
        match task.kind {
            TaskKind::RemoveNodes(nodes) => self.remove_nodes(dom, &nodes),
            TaskKind::SetHue { target, degrees } => {
                self.styles
                    .entry(target)
                    .or_default()
                    .set(AnimProperty::HueRotate, degrees);
                self.flush_style(dom, target, StyleProperty::Filter);
            }
            TaskKind::ClearFilter(target) => {
                if let Some(state) = self.styles.get_mut(&target) {
                    state.clear(AnimProperty::HueRotate);
                    if state.is_empty() {
                        self.styles.remove(&target);
                    }
                }
                dom.write_style(target, StyleProperty::Filter, "");
            }
            TaskKind::StartTween(tween) => self.start_tween(task.handle, &tween, task.due),
        }
    }

    fn flush_style<D: DomOps + ?Sized>(
        &self,
        dom: &mut D,
        element: ElementId,
        property: StyleProperty,
    ) {
        let value = self
            .styles
            .get(&element)
            .and_then(|state| state.css_value(property))
            .unwrap_or_default();
        dom.write_style(element, property, &value);
    }

    fn remove_nodes<D: DomOps + ?Sized>(&mut self, dom: &mut D, nodes: &[ElementId]) {
        for node in nodes {
            self.forget_node(*node);
            dom.remove_node(*node);
        }
    }

    /// 节点被移除时丢弃它的动画、样式状态和针对它的定时任务
    pub fn forget_node(&mut self, node: ElementId) {
        self.animations.cancel_element(node);
        self.styles.remove(&node);

        let effects = &mut self.effects;
        self.tasks.retain_mut(|task| {
            let keep = task.kind.forget(node);
            if !keep && let Some(record) = effects.get_mut(&task.handle) {
                record.tasks = record.tasks.saturating_sub(1);
            }
            keep
        });
    }

    fn collect_finished(&mut self) {
        self.effects.retain(|handle, record| {
            let keep = !record.is_finished();
            if !keep {
                debug!(effect = record.name, handle = %handle, "效果结束");
            }
            keep
        });
    }

    /// 取消效果：停止动画、丢弃任务、移除效果创建的节点
    pub fn cancel<D: DomOps + ?Sized>(&mut self, dom: &mut D, handle: EffectHandle) {
        let Some(record) = self.effects.remove(&handle) else {
            return;
        };
        self.tasks.retain(|task| task.handle != handle);

        let ids: Vec<AnimationId> = self
            .owners
            .iter()
            .filter(|(_, (owner, _))| *owner == handle)
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            self.owners.remove(&id);
            self.animations.cancel(id);
        }
        self.remove_nodes(dom, &record.owned_nodes);
        debug!(effect = record.name, handle = %handle, "效果已取消");
    }

    /// 取消全部效果
    pub fn cancel_all<D: DomOps + ?Sized>(&mut self, dom: &mut D) {
        let handles: Vec<EffectHandle> = self.effects.keys().copied().collect();
        for handle in handles {
            self.cancel(dom, handle);
        }
    }

    /// 是否没有任何进行中的效果
    pub fn is_idle(&self) -> bool {
        self.effects.is_empty() && self.animations.is_idle()
    }

    /// 进行中的效果数
    pub fn active_effects(&self) -> usize {
        self.effects.len()
    }

    /// 是否有需要逐帧采样的动画
    pub fn has_animations(&self) -> bool {
        !self.animations.is_idle()
    }

    /// 最早的定时任务时间
    pub fn next_task_due(&self) -> Option<Millis> {
        self.tasks.iter().map(|task| task.due).min()
    }

    /// 元素的动画样式状态
    pub fn style(&self, element: ElementId) -> Option<&StyleState> {
        self.styles.get(&element)
    }
}

/// 把播放器和 DOM 组合成 [`EffectSurface`]
pub struct PlayerSurface<'a, D: DomOps + ?Sized> {
    pub player: &'a mut EffectPlayer,
    pub dom: &'a mut D,
    pub now: Millis,
}

impl<'a, D: DomOps + ?Sized> PlayerSurface<'a, D> {
    pub fn new(player: &'a mut EffectPlayer, dom: &'a mut D, now: Millis) -> Self {
        Self { player, dom, now }
    }
}

impl<D: DomOps + ?Sized> EffectSurface for PlayerSurface<'_, D> {
    fn create_visual_effect(&mut self, spec: EffectSpec) -> EffectHandle {
        self.player.play(self.dom, spec, self.now)
    }

    fn cancel(&mut self, handle: EffectHandle) {
        self.player.cancel(self.dom, handle);
    }

    fn set_style(&mut self, target: ElementId, property: StyleProperty, value: &str) {
        self.dom.write_style(target, property, value);
    }

    fn text_content(&self, target: ElementId) -> Option<String> {
        self.dom.text_content(target)
    }

    fn replace_with_chars(&mut self, target: ElementId, chars: &[String]) -> Vec<ElementId> {
        self.dom.replace_with_chars(target, chars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::easing::EasingFunction;
    use crate::effect::{self, Delay};

    /// 只记录节点与样式的 DOM
    #[derive(Default)]
    struct FakeDom {
        next: u64,
        live: BTreeMap<ElementId, NodeKind>,
        removed: Vec<ElementId>,
        styles: HashMap<(ElementId, StyleProperty), String>,
    }

    impl DomOps for FakeDom {
        fn create_node(&mut self, kind: &NodeKind, _parent: Option<ElementId>) -> ElementId {
            self.next += 1;
            let id = ElementId(500 + self.next);
            self.live.insert(id, kind.clone());
            id
        }

        fn remove_node(&mut self, node: ElementId) {
            if self.live.remove(&node).is_some() {
                self.removed.push(node);
            }
        }

        fn write_style(&mut self, node: ElementId, property: StyleProperty, value: &str) {
            self.styles.insert((node, property), value.to_string());
        }

        fn text_content(&self, _node: ElementId) -> Option<String> {
            None
        }

        fn replace_with_chars(&mut self, _node: ElementId, chars: &[String]) -> Vec<ElementId> {
            chars
                .iter()
                .map(|_| {
                    self.next += 1;
                    ElementId(500 + self.next)
                })
                .collect()
        }

        fn viewport_height(&self) -> f64 {
            800.0
        }
    }

    impl FakeDom {
        fn style(&self, node: ElementId, property: StyleProperty) -> Option<&str> {
            self.styles.get(&(node, property)).map(String::as_str)
        }
    }

    #[test]
    fn test_tween_writes_styles() {
        let mut dom = FakeDom::default();
        let mut player = EffectPlayer::new();
        let target = ElementId(1);
        let tween = Tween::single(target, 100, EasingFunction::Linear)
            .track(AnimProperty::Opacity, 0.0, 1.0)
            .track(AnimProperty::TranslateY, 50.0, 0.0);
        player.play(&mut dom, EffectSpec::Tween(tween), 0);

        player.advance(&mut dom, 50);
        assert_eq!(dom.style(target, StyleProperty::Opacity), Some("0.5"));
        assert_eq!(
            dom.style(target, StyleProperty::Transform),
            Some("translateY(25px)")
        );

        player.advance(&mut dom, 100);
        assert_eq!(dom.style(target, StyleProperty::Opacity), Some("1"));
        assert!(player.is_idle());
        // 非 RemoveTargets 的目标保留
        assert!(dom.removed.is_empty());
    }

    #[test]
    fn test_stagger_delay() {
        let mut dom = FakeDom::default();
        let mut player = EffectPlayer::new();
        let targets = vec![ElementId(1), ElementId(2)];
        let tween = Tween::new(targets, 100, EasingFunction::Linear)
            .track(AnimProperty::Opacity, 0.0, 1.0)
            .with_delay(Delay::Stagger(50));
        player.play(&mut dom, EffectSpec::Tween(tween), 0);

        player.advance(&mut dom, 100);
        assert_eq!(dom.style(ElementId(1), StyleProperty::Opacity), Some("1"));
        assert_eq!(dom.style(ElementId(2), StyleProperty::Opacity), Some("0.5"));
        assert_eq!(player.active_effects(), 1);

        player.advance(&mut dom, 150);
        assert!(player.is_idle());
    }

    #[test]
    fn test_confetti_lifecycle() {
        let mut dom = FakeDom::default();
        let mut player = EffectPlayer::new();
        let palette = vec!["#0ea5e9".to_string()];
        let burst =
            ConfettiBurst::generate(5, &palette, 4000, &mut StdRng::seed_from_u64(3));
        player.play(&mut dom, EffectSpec::Confetti(burst), 0);
        assert_eq!(dom.live.len(), 6);

        // 所有粒子最迟 3200ms 完成并移除自身
        for t in (0..=3300).step_by(16) {
            player.advance(&mut dom, t);
        }
        assert_eq!(dom.live.len(), 1);
        assert!(matches!(
            dom.live.values().next(),
            Some(NodeKind::ConfettiContainer)
        ));

        // 容器按固定时间移除
        player.advance(&mut dom, 3999);
        assert_eq!(dom.live.len(), 1);
        player.advance(&mut dom, 4000);
        assert!(dom.live.is_empty());
        assert!(player.is_idle());
    }

    #[test]
    fn test_notification_lifecycle() {
        let mut dom = FakeDom::default();
        let mut player = EffectPlayer::new();
        player.play(
            &mut dom,
            EffectSpec::Notification(Notification::new("hi")),
            1000,
        );
        let node = *dom.live.keys().next().unwrap();
        assert_eq!(dom.style(node, StyleProperty::Opacity), Some("0"));

        player.advance(&mut dom, 1400);
        assert_eq!(dom.style(node, StyleProperty::Opacity), Some("1"));

        // 停留期间仍在
        player.advance(&mut dom, 3399);
        assert!(dom.live.contains_key(&node));

        // 淡出过半：easeInCubic(0.5) = 0.125
        player.advance(&mut dom, 3600);
        assert_eq!(dom.style(node, StyleProperty::Opacity), Some("0.875"));
        player.advance(&mut dom, 3800);
        assert!(!dom.live.contains_key(&node));
        assert!(player.is_idle());
    }

    #[test]
    fn test_hue_flash_steps() {
        let mut dom = FakeDom::default();
        let mut player = EffectPlayer::new();
        let target = ElementId(1);
        player.play(&mut dom, EffectSpec::HueFlash(HueFlash::new(target)), 0);

        player.advance(&mut dom, 100);
        assert_eq!(
            dom.style(target, StyleProperty::Filter),
            Some("hue-rotate(0deg)")
        );
        player.advance(&mut dom, 350);
        assert_eq!(
            dom.style(target, StyleProperty::Filter),
            Some("hue-rotate(120deg)")
        );
        player.advance(&mut dom, 600);
        assert_eq!(dom.style(target, StyleProperty::Filter), Some(""));
        assert!(player.is_idle());
        assert!(player.style(target).is_none());
    }

    #[test]
    fn test_forget_node_drops_pending_flash() {
        let mut dom = FakeDom::default();
        let mut player = EffectPlayer::new();
        let target = ElementId(1);
        player.play(&mut dom, EffectSpec::Tween(effect::spin(target)), 0);
        player.play(&mut dom, EffectSpec::HueFlash(HueFlash::new(target)), 0);

        player.advance(&mut dom, 100);
        assert!(player.style(target).is_some());

        player.forget_node(target);
        dom.styles.clear();
        assert_eq!(player.next_task_due(), None);

        player.advance(&mut dom, 300);
        player.advance(&mut dom, 700);
        assert!(dom.styles.is_empty());
        assert!(player.style(target).is_none());
        assert!(player.is_idle());
    }

    #[test]
    fn test_forget_node_keeps_other_targets() {
        let mut dom = FakeDom::default();
        let mut player = EffectPlayer::new();
        player.play(&mut dom, EffectSpec::HueFlash(HueFlash::new(ElementId(1))), 0);
        player.play(&mut dom, EffectSpec::HueFlash(HueFlash::new(ElementId(2))), 0);

        player.forget_node(ElementId(1));
        player.advance(&mut dom, 200);
        assert_eq!(player.active_effects(), 1);
        assert_eq!(dom.style(ElementId(1), StyleProperty::Filter), None);
        assert_eq!(
            dom.style(ElementId(2), StyleProperty::Filter),
            Some("hue-rotate(60deg)")
        );
    }

    #[test]
    fn test_shake_returns_to_origin() {
        let mut dom = FakeDom::default();
        let mut player = EffectPlayer::new();
        let target = ElementId(1);
        player.play(&mut dom, EffectSpec::Tween(effect::shake(target)), 0);

        player.advance(&mut dom, 50);
        assert_eq!(
            dom.style(target, StyleProperty::Transform),
            Some("translateX(-10px)")
        );
        player.advance(&mut dom, 250);
        assert_eq!(
            dom.style(target, StyleProperty::Transform),
            Some("translateX(0px)")
        );
    }

    #[test]
    fn test_cancel_removes_owned_nodes() {
        let mut dom = FakeDom::default();
        let mut player = EffectPlayer::new();
        let handle = player.play(
            &mut dom,
            EffectSpec::Notification(Notification::new("bye")),
            0,
        );
        assert_eq!(dom.live.len(), 1);

        player.cancel(&mut dom, handle);
        assert!(dom.live.is_empty());
        assert!(player.is_idle());
        assert_eq!(player.next_task_due(), None);

        // 重复取消无副作用
        player.cancel(&mut dom, handle);
    }

    #[test]
    fn test_player_surface() {
        let mut dom = FakeDom::default();
        let mut player = EffectPlayer::new();
        {
            let mut surface = PlayerSurface::new(&mut player, &mut dom, 0);
            surface.set_style(ElementId(9), StyleProperty::Display, "inline-block");
            surface.create_visual_effect(EffectSpec::Tween(effect::spin(ElementId(9))));
        }
        assert_eq!(
            dom.style(ElementId(9), StyleProperty::Display),
            Some("inline-block")
        );
        player.advance(&mut dom, 600);
        assert_eq!(
            dom.style(ElementId(9), StyleProperty::Transform),
            Some("rotate(360deg)")
        );
    }
}
