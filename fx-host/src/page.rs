//! # Page 模块
//!
//! 无头页面：把场景中声明的元素和行为挂到 [`SimDom`] 上，
//! 按虚拟时间驱动定时器、帧回调、相交测量和效果播放。
//!
//! ## 单步顺序
//!
//! ```text
//! advance_to(t):
//!   while 下一个定时器 / 帧 <= t:
//!     定时器（同一时刻先于帧）
//!     帧：rAF 回调 → 效果播放 → 相交测量 → 写回 transform
//! dispatch(event)
//! ```

use std::collections::HashSet;

use fx_runtime::{
    ClickOutcome, DomOps, EasterEggTrigger, EffectPlayer, ElementId, IntersectionHost, LayerId,
    Millis, MouseParallax, MultiLayerParallax, MultiVisibilityTracker, PlayerSurface, Point,
    RevealAnimator, Scheduler, ScrollParallax, ScrollProgress, StyleProperty, TextStagger, Viewport,
    VisibilityTracker,
};
use tracing::{debug, info, trace};

use crate::config::HostConfig;
use crate::dom::{SimDom, SimNodeKind};
use crate::error::HostResult;
use crate::intersection::{IntersectionRegistry, ObserverId};
use crate::scenario::{Action, Behavior, GroupSpec, Scenario, ScenarioEvent};
use crate::scheduler::VirtualScheduler;
use crate::snapshot::{EasterEggSnapshot, ElementSnapshot, GroupSnapshot, PageSnapshot, PageStats};

/// 挂在单个元素上的组件
#[derive(Debug)]
enum Component {
    Visibility {
        element: ElementId,
        observer: ObserverId,
        tracker: VisibilityTracker,
    },
    Reveal {
        element: ElementId,
        observer: ObserverId,
        animator: RevealAnimator,
    },
    Parallax {
        element: ElementId,
        sampler: ScrollParallax,
        rendered: u64,
    },
    Mouse {
        element: ElementId,
        sampler: MouseParallax,
        rendered: u64,
    },
}

impl Component {
    fn element(&self) -> ElementId {
        match self {
            Component::Visibility { element, .. }
            | Component::Reveal { element, .. }
            | Component::Parallax { element, .. }
            | Component::Mouse { element, .. } => *element,
        }
    }
}

#[derive(Debug)]
struct Group {
    name: String,
    observer: ObserverId,
    tracker: MultiVisibilityTracker,
}

/// 无头页面
#[derive(Debug)]
pub struct Page {
    name: String,
    frame_interval: Millis,
    dom: SimDom,
    scheduler: VirtualScheduler,
    intersections: IntersectionRegistry,
    player: EffectPlayer,
    components: Vec<Component>,
    groups: Vec<Group>,
    layers: MultiLayerParallax,
    layer_bindings: Vec<(LayerId, ElementId)>,
    progress: Option<ScrollProgress>,
    easter_egg: EasterEggTrigger,
    egg_targets: HashSet<ElementId>,
    text_stagger: TextStagger,
    elements: Vec<(String, ElementId)>,
    next_frame: Millis,
    frames: u64,
    clicks: Vec<ClickOutcome>,
    konami_matches: u32,
}

impl Page {
    /// 构建页面并挂载全部行为
    pub fn new(config: &HostConfig, scenario: &Scenario) -> HostResult<Self> {
        config.validate()?;
        scenario.validate()?;

        let size = scenario.viewport.unwrap_or(config.viewport);
        let viewport = Viewport {
            scroll_x: 0.0,
            scroll_y: 0.0,
            width: size.width,
            height: size.height,
            document_height: scenario.document_height,
        };

        let mut page = Self {
            name: scenario.name.clone(),
            frame_interval: config.frame_interval_ms,
            dom: SimDom::new(viewport),
            scheduler: VirtualScheduler::new(),
            intersections: IntersectionRegistry::new(),
            player: EffectPlayer::new(),
            components: Vec::new(),
            groups: Vec::new(),
            layers: MultiLayerParallax::new(),
            layer_bindings: Vec::new(),
            progress: scenario.progress.then(ScrollProgress::new),
            easter_egg: EasterEggTrigger::new(config.easter_egg.clone(), config.seed)?,
            egg_targets: HashSet::new(),
            text_stagger: TextStagger::new(config.text_stagger_ms),
            elements: Vec::new(),
            next_frame: 0,
            frames: 0,
            clicks: Vec::new(),
            konami_matches: 0,
        };

        for spec in &scenario.elements {
            let id = page.dom.add_element(&spec.name, spec.rect, &spec.text);
            page.elements.push((spec.name.clone(), id));
        }
        for (spec, (_, id)) in scenario.elements.iter().zip(page.elements.clone()) {
            for behavior in &spec.behaviors {
                page.mount_behavior(id, behavior)?;
            }
        }
        if !page.layer_bindings.is_empty() {
            page.layers.mount();
        }
        for group in &scenario.groups {
            page.mount_group(group)?;
        }
        let viewport = page.dom.viewport();
        if let Some(progress) = page.progress.as_mut() {
            progress.mount(&viewport);
        }
        page.render();

        info!(
            scenario = %page.name,
            elements = page.elements.len(),
            components = page.components.len(),
            groups = page.groups.len(),
            "页面已挂载"
        );
        Ok(page)
    }

    fn mount_behavior(&mut self, element: ElementId, behavior: &Behavior) -> HostResult<()> {
        match behavior {
            Behavior::Visibility(options) => {
                let observer = self.intersections.create_observer();
                let mut tracker = VisibilityTracker::new(options.clone())?;
                tracker.attach(Some(element), &mut self.intersections.host(observer));
                self.components.push(Component::Visibility {
                    element,
                    observer,
                    tracker,
                });
            }
            Behavior::Reveal(options) => {
                let observer = self.intersections.create_observer();
                let mut animator = RevealAnimator::new(options.clone())?;
                animator.attach(Some(element), &mut self.intersections.host(observer));
                self.components.push(Component::Reveal {
                    element,
                    observer,
                    animator,
                });
            }
            Behavior::Parallax(options) => {
                let mut sampler = ScrollParallax::new(options.clone())?;
                sampler.mount(
                    Some(element),
                    &self.dom.viewport(),
                    self.dom.client_rect(element),
                );
                self.components.push(Component::Parallax {
                    element,
                    sampler,
                    rendered: 0,
                });
            }
            Behavior::MouseParallax { intensity } => {
                let mut sampler = MouseParallax::new(*intensity)?;
                sampler.mount(Some(element));
                self.components.push(Component::Mouse {
                    element,
                    sampler,
                    rendered: 0,
                });
            }
            Behavior::Layer { speed } => {
                let layer = self.layers.add_layer(*speed)?;
                self.layers.bind(layer, Some(element));
                self.layer_bindings.push((layer, element));
            }
            Behavior::EasterEgg => {
                self.egg_targets.insert(element);
            }
        }
        Ok(())
    }

    fn mount_group(&mut self, spec: &GroupSpec) -> HostResult<()> {
        let observer = self.intersections.create_observer();
        let mut tracker = MultiVisibilityTracker::new(spec.members.len(), spec.options.clone())?;
        for (index, member) in spec.members.iter().enumerate() {
            tracker.set_ref(index, self.dom.element_by_name(member));
        }
        tracker.mount(&mut self.intersections.host(observer));
        self.groups.push(Group {
            name: spec.name.clone(),
            observer,
            tracker,
        });
        Ok(())
    }

    /// 当前虚拟时间
    pub fn now(&self) -> Millis {
        self.scheduler.now()
    }

    pub fn dom(&self) -> &SimDom {
        &self.dom
    }

    pub fn element(&self, name: &str) -> Option<ElementId> {
        self.dom.element_by_name(name)
    }

    /// 回放全部事件并推进到结束时间
    pub fn run(&mut self, scenario: &Scenario, settle: Millis) -> PageSnapshot {
        info!(scenario = %scenario.name, events = scenario.events.len(), "开始回放");
        for event in &scenario.events {
            self.advance_to(event.at);
            self.dispatch(event);
        }
        let until = scenario
            .until
            .unwrap_or_else(|| scenario.last_event_at() + settle);
        self.advance_to(until);
        info!(scenario = %scenario.name, time = until, frames = self.frames, "回放结束");
        self.snapshot()
    }

    /// 推进虚拟时间到 `target`（含）
    pub fn advance_to(&mut self, target: Millis) {
        loop {
            let next_frame = self.next_frame;
            let (time, is_timer) = match self.scheduler.next_timer_due() {
                Some(due) if due <= next_frame => (due, true),
                _ => (next_frame, false),
            };
            if time > target {
                break;
            }
            if is_timer {
                self.fire_timers(time);
            } else {
                self.run_frame(time);
            }
        }
        self.scheduler.set_now(target);
    }

    fn fire_timers(&mut self, time: Millis) {
        self.scheduler.set_now(time);
        for timer in self.scheduler.pop_due_timers(time) {
            if self.easter_egg.handle_timer(timer) {
                debug!(timer = %timer, time, "彩蛋复位");
            }
        }
    }

    fn run_frame(&mut self, time: Millis) {
        self.scheduler.set_now(time);
        self.next_frame = time + self.frame_interval;
        self.frames += 1;

        let viewport = self.dom.viewport();
        for frame in self.scheduler.take_frame_requests() {
            trace!(frame = %frame, time, "帧回调");
            for component in &mut self.components {
                if let Component::Parallax {
                    element, sampler, ..
                } = component
                {
                    let rect = self.dom.client_rect(*element);
                    sampler.on_frame(frame, &viewport, rect);
                }
            }
            let mut surface = PlayerSurface::new(&mut self.player, &mut self.dom, time);
            self.layers.on_frame(frame, viewport.scroll_y, &mut surface);
        }

        self.player.advance(&mut self.dom, time);
        self.deliver_intersections(time);
        self.render();
    }

    fn deliver_intersections(&mut self, time: Millis) {
        for (observer, entries) in self.intersections.compute(&self.dom) {
            for component in &mut self.components {
                match component {
                    Component::Visibility {
                        observer: owner,
                        tracker,
                        ..
                    } if *owner == observer => {
                        tracker.handle_entries(&entries, &mut self.intersections.host(observer));
                    }
                    Component::Reveal {
                        observer: owner,
                        animator,
                        ..
                    } if *owner == observer => {
                        let mut surface = PlayerSurface::new(&mut self.player, &mut self.dom, time);
                        animator.handle_entries(
                            &entries,
                            &mut self.intersections.host(observer),
                            &mut surface,
                        );
                    }
                    _ => {}
                }
            }
            for group in &mut self.groups {
                if group.observer == observer {
                    group
                        .tracker
                        .handle_entries(&entries, &mut self.intersections.host(observer));
                }
            }
        }
    }

    /// 把组件暴露的 transform 写回 DOM（相当于模板绑定）
    fn render(&mut self) {
        for component in &mut self.components {
            let (element, transform, rendered) = match component {
                Component::Parallax {
                    element,
                    sampler,
                    rendered,
                } => (*element, sampler.transform(), rendered),
                Component::Mouse {
                    element,
                    sampler,
                    rendered,
                } => (*element, sampler.transform(), rendered),
                _ => continue,
            };
            if transform.revision() != *rendered {
                *rendered = transform.revision();
                self.dom
                    .write_style(element, StyleProperty::Transform, transform.get());
            }
        }
    }

    /// 派发一个输入事件
    pub fn dispatch(&mut self, event: &ScenarioEvent) {
        let now = event.at;
        self.scheduler.set_now(now);
        debug!(at = now, action = ?event.action, "派发事件");

        match &event.action {
            Action::Scroll { y } => {
                self.dom.scroll_to(*y);
                for component in &mut self.components {
                    if let Component::Parallax { sampler, .. } = component {
                        sampler.on_scroll(&mut self.scheduler);
                    }
                }
                self.layers.on_scroll(&mut self.scheduler);
                let viewport = self.dom.viewport();
                if let Some(progress) = self.progress.as_mut() {
                    progress.on_scroll(&viewport);
                }
            }
            Action::PointerMove { x, y } => {
                let pointer = Point::new(*x, *y);
                for component in &mut self.components {
                    if let Component::Mouse {
                        element, sampler, ..
                    } = component
                    {
                        sampler.on_pointer_move(pointer, self.dom.client_rect(*element));
                    }
                }
                self.render();
            }
            Action::Click { target } => self.click(target, now),
            Action::Key { key } => {
                let mut surface = PlayerSurface::new(&mut self.player, &mut self.dom, now);
                if self.easter_egg.handle_key(key, &mut surface) {
                    self.konami_matches += 1;
                }
            }
            Action::AnimateText { target } => {
                let element = self.dom.element_by_name(target);
                let mut surface = PlayerSurface::new(&mut self.player, &mut self.dom, now);
                self.text_stagger.animate_text(element, &mut surface);
            }
            Action::Resize { width, height } => {
                self.dom.resize(*width, *height);
            }
            Action::Unmount { target } => {
                if let Some(element) = self.dom.element_by_name(target) {
                    self.unmount(element);
                }
            }
        }
    }

    fn click(&mut self, target: &str, now: Millis) {
        let declared = self
            .elements
            .iter()
            .find(|(name, _)| name == target)
            .map(|(_, id)| *id);
        // 只有挂了彩蛋的元素才有点击监听
        let Some(declared) = declared.filter(|id| self.egg_targets.contains(id)) else {
            return;
        };
        let live = Some(declared).filter(|id| self.dom.contains(*id));
        let mut surface = PlayerSurface::new(&mut self.player, &mut self.dom, now);
        let outcome = self
            .easter_egg
            .trigger(live, &mut self.scheduler, &mut surface);
        debug!(element = target, ?outcome, count = self.easter_egg.click_count(), "点击");
        self.clicks.push(outcome);
    }

    /// 卸载元素：拆除绑定在它上面的组件，再从文档移除
    fn unmount(&mut self, element: ElementId) {
        let mut kept = Vec::with_capacity(self.components.len());
        for mut component in std::mem::take(&mut self.components) {
            if component.element() != element {
                kept.push(component);
                continue;
            }
            match &mut component {
                Component::Visibility {
                    observer, tracker, ..
                } => tracker.teardown(&mut self.intersections.host(*observer)),
                Component::Reveal {
                    observer, animator, ..
                } => animator.teardown(&mut self.intersections.host(*observer)),
                Component::Parallax { sampler, .. } => sampler.unmount(&mut self.scheduler),
                Component::Mouse { sampler, .. } => sampler.unmount(),
            }
        }
        self.components = kept;

        for (layer, bound) in &self.layer_bindings {
            if *bound == element {
                self.layers.bind(*layer, None);
            }
        }
        for group in &mut self.groups {
            if let Some(index) = group.tracker.refs().iter().position(|r| *r == Some(element)) {
                group.tracker.set_ref(index, None);
                self.intersections
                    .host(group.observer)
                    .unobserve(element);
            }
        }

        for node in self.dom.detach(element) {
            self.player.forget_node(node);
        }
        info!(element = %element, "元素已卸载");
    }

    /// 拆除整个页面：停止所有组件、清理定时器和进行中的效果
    pub fn shutdown(&mut self) {
        for component in &mut self.components {
            match component {
                Component::Visibility {
                    observer, tracker, ..
                } => tracker.teardown(&mut self.intersections.host(*observer)),
                Component::Reveal {
                    observer, animator, ..
                } => animator.teardown(&mut self.intersections.host(*observer)),
                Component::Parallax { sampler, .. } => sampler.unmount(&mut self.scheduler),
                Component::Mouse { sampler, .. } => sampler.unmount(),
            }
        }
        for group in &mut self.groups {
            group
                .tracker
                .teardown(&mut self.intersections.host(group.observer));
        }
        self.layers.unmount(&mut self.scheduler);
        if let Some(progress) = self.progress.as_mut() {
            progress.unmount();
        }
        self.easter_egg.teardown(&mut self.scheduler);
        self.player.cancel_all(&mut self.dom);
        info!(scenario = %self.name, "页面已拆除");
    }

    /// 当前页面状态
    pub fn snapshot(&self) -> PageSnapshot {
        let elements = self
            .elements
            .iter()
            .map(|(name, id)| self.element_snapshot(name, *id))
            .collect();

        let groups = self
            .groups
            .iter()
            .map(|group| GroupSnapshot {
                name: group.name.clone(),
                states: group.tracker.visibility_states().to_vec(),
            })
            .collect();

        let easter_egg = EasterEggSnapshot {
            click_count: self.easter_egg.click_count(),
            active: self.easter_egg.active().value(),
            konami_progress: self
                .easter_egg
                .konami_progress()
                .into_iter()
                .map(str::to_string)
                .collect(),
            konami_matches: self.konami_matches,
            clicks: self.clicks.clone(),
        };

        let parallax_recomputations = self
            .components
            .iter()
            .map(|component| match component {
                Component::Parallax { sampler, .. } => sampler.recomputations(),
                _ => 0,
            })
            .sum();

        PageSnapshot {
            scenario: self.name.clone(),
            time: self.scheduler.now(),
            scroll_y: self.dom.viewport().scroll_y,
            progress: self.progress.as_ref().map(|p| p.progress().value()),
            elements,
            groups,
            easter_egg,
            stats: PageStats {
                frames: self.frames,
                frame_requests: self.scheduler.frames_requested(),
                parallax_recomputations,
                layer_recomputations: self.layers.recomputations(),
                generated_nodes: self.dom.generated_total(),
                live_generated_nodes: self.dom.live_generated(),
                active_effects: self.player.active_effects(),
                pending_timers: self.scheduler.pending_timers(),
            },
        }
    }

    fn element_snapshot(&self, name: &str, id: ElementId) -> ElementSnapshot {
        let mut visible = None;
        let mut has_triggered = None;
        let mut revealed = None;
        for component in self.components.iter().filter(|c| c.element() == id) {
            match component {
                Component::Visibility { tracker, .. } if has_triggered.is_none() => {
                    visible = Some(tracker.is_visible().value());
                    has_triggered = Some(tracker.has_triggered().value());
                }
                Component::Reveal { animator, .. } if revealed.is_none() => {
                    revealed = Some(animator.is_visible().value());
                }
                _ => {}
            }
        }
        // 可见性跟踪优先，其次是揭示动画
        let visible = visible.or(revealed);

        let node = self.dom.node(id);
        let chars = node.map_or(0, |node| {
            node.children
                .iter()
                .filter(|child| {
                    self.dom
                        .node(**child)
                        .is_some_and(|c| c.kind == SimNodeKind::Char)
                })
                .count()
        });

        ElementSnapshot {
            name: name.to_string(),
            mounted: node.is_some(),
            visible,
            has_triggered,
            styles: node.map(|node| node.styles.clone()).unwrap_or_default(),
            chars,
        }
    }
}
