//! # Effects 模块
//!
//! 页面级效果服务：持有调度器、效果播放器和全部组件。
//! 全局监听（scroll / mousemove / keydown）只在安装时注册一次，
//! 服务析构时移除监听、取消定时器和帧、停止所有效果。

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use fx_runtime::{
    DomOps, EasterEggConfig, EasterEggTrigger, EffectPlayer, ElementId, FrameId, FxResult,
    IntersectionHost, LayerId, MouseParallax, MultiLayerParallax, MultiVisibilityTracker,
    ParallaxOptions, PlayerSurface, Point, RevealAnimator, RevealOptions, Scheduler,
    ScrollParallax, ScrollProgress, StyleProperty, TextStagger, VisibilityOptions,
    VisibilityTracker,
};
use gloo::events::EventListener;
use tracing::{debug, info, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Event, EventTarget, HtmlElement, KeyboardEvent, MouseEvent};

use crate::dom::WebDom;
use crate::intersection::WebIntersectionHost;
use crate::registry::ElementRegistry;
use crate::scheduler::{Wake, WakeFn, WebScheduler};

/// 占用一个 IntersectionObserver 的组件
enum Observed {
    Visibility(VisibilityTracker),
    Reveal(RevealAnimator),
    Group(MultiVisibilityTracker),
}

struct ObserverSlot {
    host: WebIntersectionHost,
    observed: Observed,
}

impl ObserverSlot {
    fn teardown(&mut self) {
        match &mut self.observed {
            Observed::Visibility(tracker) => tracker.teardown(&mut self.host),
            Observed::Reveal(animator) => animator.teardown(&mut self.host),
            Observed::Group(tracker) => tracker.teardown(&mut self.host),
        }
    }
}

/// [`WebEffects::visibility`] 返回的句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityHandle(usize);

/// [`WebEffects::visibility_group`] 返回的句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupHandle(usize);

/// 单个元素的可见性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub is_visible: bool,
    pub has_triggered: bool,
}

struct Bound<T> {
    element: ElementId,
    sampler: T,
    rendered: u64,
}

struct Inner {
    registry: Rc<RefCell<ElementRegistry>>,
    wake: WakeFn,
    scheduler: WebScheduler,
    dom: WebDom,
    player: EffectPlayer,
    /// 下标即观察者编号；拆除后留空
    observers: Vec<Option<ObserverSlot>>,
    parallax: Vec<Bound<ScrollParallax>>,
    mouse: Vec<Bound<MouseParallax>>,
    layers: MultiLayerParallax,
    layer_bindings: Vec<(LayerId, ElementId)>,
    progress: ScrollProgress,
    easter_egg: Option<EasterEggTrigger>,
    egg_target: Option<ElementId>,
    egg_listener: Option<EventListener>,
    text_stagger: TextStagger,
    /// 驱动效果播放的帧
    pump: Option<FrameId>,
}

impl Inner {
    fn handle(&mut self, wake: Wake) {
        self.scheduler.release_spent();
        match wake {
            Wake::Timer(timer) => {
                self.scheduler.retire_timer(timer);
                if let Some(egg) = self.easter_egg.as_mut() {
                    egg.handle_timer(timer);
                }
            }
            Wake::Frame(frame) => {
                self.scheduler.retire_frame(frame);
                self.on_frame(frame);
            }
            Wake::Intersections { observer, entries } => {
                let now = self.scheduler.now();
                let Some(slot) = self.observers.get_mut(observer).and_then(Option::as_mut) else {
                    return;
                };
                match &mut slot.observed {
                    Observed::Visibility(tracker) => {
                        tracker.handle_entries(&entries, &mut slot.host);
                    }
                    Observed::Reveal(animator) => {
                        let mut surface = PlayerSurface::new(&mut self.player, &mut self.dom, now);
                        animator.handle_entries(&entries, &mut slot.host, &mut surface);
                    }
                    Observed::Group(tracker) => tracker.handle_entries(&entries, &mut slot.host),
                }
            }
        }
        self.render();
        self.ensure_pump();
    }

    fn on_frame(&mut self, frame: FrameId) {
        let now = self.scheduler.now();
        if self.pump == Some(frame) {
            self.pump = None;
            self.player.advance(&mut self.dom, now);
        }

        let viewport = self.dom.viewport();
        for bound in &mut self.parallax {
            let rect = self.dom.client_rect(bound.element);
            bound.sampler.on_frame(frame, &viewport, rect);
        }
        let mut surface = PlayerSurface::new(&mut self.player, &mut self.dom, now);
        self.layers.on_frame(frame, viewport.scroll_y, &mut surface);
    }

    /// 把采样结果写回元素
    fn render(&mut self) {
        for bound in &mut self.parallax {
            let transform = bound.sampler.transform();
            if transform.revision() != bound.rendered {
                bound.rendered = transform.revision();
                self.dom
                    .write_style(bound.element, StyleProperty::Transform, transform.get());
            }
        }
        for bound in &mut self.mouse {
            let transform = bound.sampler.transform();
            if transform.revision() != bound.rendered {
                bound.rendered = transform.revision();
                self.dom
                    .write_style(bound.element, StyleProperty::Transform, transform.get());
            }
        }
    }

    fn ensure_pump(&mut self) {
        if self.pump.is_none() && !self.player.is_idle() {
            self.pump = Some(self.scheduler.request_frame());
        }
    }

    fn on_scroll(&mut self) {
        for bound in &mut self.parallax {
            bound.sampler.on_scroll(&mut self.scheduler);
        }
        self.layers.on_scroll(&mut self.scheduler);
        let viewport = self.dom.viewport();
        self.progress.on_scroll(&viewport);
    }

    fn on_pointer_move(&mut self, pointer: Point) {
        for bound in &mut self.mouse {
            let rect = self.dom.client_rect(bound.element);
            bound.sampler.on_pointer_move(pointer, rect);
        }
        self.render();
    }

    fn on_key(&mut self, key: &str) {
        let now = self.scheduler.now();
        if let Some(egg) = self.easter_egg.as_mut() {
            let mut surface = PlayerSurface::new(&mut self.player, &mut self.dom, now);
            egg.handle_key(key, &mut surface);
        }
        self.ensure_pump();
    }

    fn on_click(&mut self, target: ElementId) {
        let live = self
            .registry
            .borrow()
            .get(target)
            .is_some_and(|element| element.is_connected())
            .then_some(target);
        let now = self.scheduler.now();
        if let Some(egg) = self.easter_egg.as_mut() {
            let mut surface = PlayerSurface::new(&mut self.player, &mut self.dom, now);
            let outcome = egg.trigger(live, &mut self.scheduler, &mut surface);
            debug!(?outcome, count = egg.click_count(), "点击");
        }
        self.ensure_pump();
    }

    /// 新建观察者槽位，返回编号
    fn add_observer(
        &mut self,
        observed: impl FnOnce(&mut WebIntersectionHost) -> Observed,
    ) -> usize {
        let key = self.observers.len();
        let mut host =
            WebIntersectionHost::new(key, Rc::clone(&self.registry), Rc::clone(&self.wake));
        let observed = observed(&mut host);
        self.observers.push(Some(ObserverSlot { host, observed }));
        key
    }

    fn slot(&self, key: usize) -> Option<&Observed> {
        self.observers
            .get(key)
            .and_then(Option::as_ref)
            .map(|slot| &slot.observed)
    }

    /// 拆除绑定在元素（及其已注册的后代）上的全部组件
    fn detach(&mut self, element: ElementId, nodes: &[ElementId]) {
        for entry in &mut self.observers {
            let Some(slot) = entry else {
                continue;
            };
            let owned = match &mut slot.observed {
                Observed::Visibility(tracker) => tracker.element() == Some(element),
                Observed::Reveal(animator) => animator.element() == Some(element),
                Observed::Group(tracker) => {
                    if let Some(index) = tracker.refs().iter().position(|r| *r == Some(element)) {
                        tracker.set_ref(index, None);
                        slot.host.unobserve(element);
                    }
                    false
                }
            };
            if owned {
                slot.teardown();
                *entry = None;
            }
        }

        self.parallax.retain_mut(|bound| {
            let keep = bound.element != element;
            if !keep {
                bound.sampler.unmount(&mut self.scheduler);
            }
            keep
        });
        self.mouse.retain_mut(|bound| {
            let keep = bound.element != element;
            if !keep {
                bound.sampler.unmount();
            }
            keep
        });
        for (layer, bound) in &self.layer_bindings {
            if *bound == element {
                self.layers.bind(*layer, None);
            }
        }
        self.layer_bindings.retain(|(_, bound)| *bound != element);

        if self.egg_target == Some(element) {
            self.egg_target = None;
            self.egg_listener = None;
        }

        let mut registry = self.registry.borrow_mut();
        for node in nodes {
            self.player.forget_node(*node);
            registry.remove(*node);
        }
        debug!(element = %element, nodes = nodes.len(), "元素已解绑");
    }

    fn teardown(&mut self) {
        for slot in self.observers.iter_mut().flatten() {
            slot.teardown();
        }
        for bound in &mut self.parallax {
            bound.sampler.unmount(&mut self.scheduler);
        }
        for bound in &mut self.mouse {
            bound.sampler.unmount();
        }
        self.layers.unmount(&mut self.scheduler);
        self.progress.unmount();
        if let Some(egg) = self.easter_egg.as_mut() {
            egg.teardown(&mut self.scheduler);
        }
        self.egg_listener = None;
        self.player.cancel_all(&mut self.dom);
        self.scheduler.clear();
        self.pump = None;
    }
}

fn wake_fn(weak: Weak<RefCell<Inner>>) -> WakeFn {
    Rc::new(move |wake| {
        let Some(cell) = weak.upgrade() else {
            return;
        };
        match cell.try_borrow_mut() {
            Ok(mut inner) => inner.handle(wake),
            Err(_) => warn!(?wake, "重入的回调被丢弃"),
        }
    })
}

fn listen<F>(
    inner: &Rc<RefCell<Inner>>,
    target: &EventTarget,
    event_type: &'static str,
    handler: F,
) -> EventListener
where
    F: Fn(&mut Inner, &Event) + 'static,
{
    let weak = Rc::downgrade(inner);
    EventListener::new(target, event_type, move |event| {
        let Some(cell) = weak.upgrade() else {
            return;
        };
        match cell.try_borrow_mut() {
            Ok(mut inner) => handler(&mut inner, event),
            Err(_) => warn!(event_type, "重入的事件被丢弃"),
        }
    })
}

/// 页面效果服务
///
/// 每个页面安装一次；析构即卸载。
pub struct WebEffects {
    inner: Rc<RefCell<Inner>>,
    listeners: Vec<EventListener>,
}

impl WebEffects {
    /// 安装服务并注册全局监听
    pub fn install(text_stagger_ms: u64) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("window 不存在"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("document 不存在"))?;
        let registry = Rc::new(RefCell::new(ElementRegistry::new()));

        let inner = Rc::new_cyclic(|weak: &Weak<RefCell<Inner>>| {
            let wake = wake_fn(weak.clone());
            RefCell::new(Inner {
                registry: Rc::clone(&registry),
                scheduler: WebScheduler::new(Rc::clone(&wake)),
                dom: WebDom::new(window.clone(), document, Rc::clone(&registry)),
                wake,
                player: EffectPlayer::new(),
                observers: Vec::new(),
                parallax: Vec::new(),
                mouse: Vec::new(),
                layers: MultiLayerParallax::new(),
                layer_bindings: Vec::new(),
                progress: ScrollProgress::new(),
                easter_egg: None,
                egg_target: None,
                egg_listener: None,
                text_stagger: TextStagger::new(text_stagger_ms),
                pump: None,
            })
        });
        {
            let mut guard = inner.borrow_mut();
            let viewport = guard.dom.viewport();
            guard.progress.mount(&viewport);
        }

        let listeners = vec![
            listen(&inner, &window, "scroll", |inner, _| inner.on_scroll()),
            listen(&inner, &window, "mousemove", |inner, event| {
                if let Some(e) = event.dyn_ref::<MouseEvent>() {
                    let pointer = Point::new(f64::from(e.client_x()), f64::from(e.client_y()));
                    inner.on_pointer_move(pointer);
                }
            }),
            listen(&inner, &window, "keydown", |inner, event| {
                if let Some(e) = event.dyn_ref::<KeyboardEvent>() {
                    inner.on_key(&e.key());
                }
            }),
        ];

        info!("效果服务已安装");
        Ok(Self { inner, listeners })
    }

    /// 跟踪元素可见性
    pub fn visibility(
        &mut self,
        element: &HtmlElement,
        options: VisibilityOptions,
    ) -> FxResult<VisibilityHandle> {
        let mut inner = self.inner.borrow_mut();
        let mut tracker = VisibilityTracker::new(options)?;
        let id = inner.registry.borrow_mut().register(element);
        let key = inner.add_observer(|host| {
            tracker.attach(Some(id), host);
            Observed::Visibility(tracker)
        });
        Ok(VisibilityHandle(key))
    }

    /// 当前可见性；元素已解绑时为 `None`
    pub fn visibility_state(&self, handle: VisibilityHandle) -> Option<Visibility> {
        match self.inner.borrow().slot(handle.0)? {
            Observed::Visibility(tracker) => Some(Visibility {
                is_visible: tracker.is_visible().value(),
                has_triggered: tracker.has_triggered().value(),
            }),
            _ => None,
        }
    }

    /// 一组元素共享一个观察者
    pub fn visibility_group(
        &mut self,
        elements: &[HtmlElement],
        options: VisibilityOptions,
    ) -> FxResult<GroupHandle> {
        let mut inner = self.inner.borrow_mut();
        let mut tracker = MultiVisibilityTracker::new(elements.len(), options)?;
        for (index, element) in elements.iter().enumerate() {
            let id = inner.registry.borrow_mut().register(element);
            tracker.set_ref(index, Some(id));
        }
        let key = inner.add_observer(|host| {
            tracker.mount(host);
            Observed::Group(tracker)
        });
        Ok(GroupHandle(key))
    }

    /// 组内各元素的可见性
    pub fn group_states(&self, handle: GroupHandle) -> Vec<bool> {
        match self.inner.borrow().slot(handle.0) {
            Some(Observed::Group(tracker)) => tracker.visibility_states().to_vec(),
            _ => Vec::new(),
        }
    }

    /// 元素进入视口时播放揭示动画
    pub fn reveal(&mut self, element: &HtmlElement, options: RevealOptions) -> FxResult<()> {
        let mut inner = self.inner.borrow_mut();
        let mut animator = RevealAnimator::new(options)?;
        let id = inner.registry.borrow_mut().register(element);
        inner.add_observer(|host| {
            animator.attach(Some(id), host);
            Observed::Reveal(animator)
        });
        Ok(())
    }

    /// 滚动视差
    pub fn parallax(&mut self, element: &HtmlElement, options: ParallaxOptions) -> FxResult<()> {
        let mut inner = self.inner.borrow_mut();
        let mut sampler = ScrollParallax::new(options)?;
        let id = inner.registry.borrow_mut().register(element);
        let viewport = inner.dom.viewport();
        let rect = inner.dom.client_rect(id);
        sampler.mount(Some(id), &viewport, rect);
        inner.parallax.push(Bound {
            element: id,
            sampler,
            rendered: 0,
        });
        inner.render();
        Ok(())
    }

    /// 指针视差
    pub fn mouse_parallax(&mut self, element: &HtmlElement, intensity: f64) -> FxResult<()> {
        let mut inner = self.inner.borrow_mut();
        let mut sampler = MouseParallax::new(intensity)?;
        let id = inner.registry.borrow_mut().register(element);
        sampler.mount(Some(id));
        inner.mouse.push(Bound {
            element: id,
            sampler,
            rendered: 0,
        });
        Ok(())
    }

    /// 多图层视差，`layers` 为 (元素, 速度)
    pub fn parallax_layers(&mut self, layers: &[(HtmlElement, f64)]) -> FxResult<()> {
        let mut inner = self.inner.borrow_mut();
        for (element, speed) in layers {
            let layer = inner.layers.add_layer(*speed)?;
            let id = inner.registry.borrow_mut().register(element);
            inner.layers.bind(layer, Some(id));
            inner.layer_bindings.push((layer, id));
        }
        inner.layers.mount();
        Ok(())
    }

    /// 在目标元素上安装点击彩蛋，同时启用 Konami 序列
    ///
    /// 再次调用会先拆除之前的彩蛋（复位定时器与点击监听）。
    pub fn easter_egg(
        &mut self,
        target: &HtmlElement,
        config: EasterEggConfig,
        seed: u64,
    ) -> FxResult<()> {
        let trigger = EasterEggTrigger::new(config, seed)?;
        let id = self.inner.borrow().registry.borrow_mut().register(target);
        let listener = listen(&self.inner, target, "click", move |inner, _| {
            inner.on_click(id)
        });

        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;
        if let Some(mut previous) = inner.easter_egg.take() {
            previous.teardown(&mut inner.scheduler);
            debug!("替换已有彩蛋");
        }
        inner.easter_egg = Some(trigger);
        inner.egg_target = Some(id);
        // 旧监听随赋值析构
        inner.egg_listener = Some(listener);
        Ok(())
    }

    /// 逐字淡入，返回字符数
    pub fn animate_text(&mut self, element: &HtmlElement) -> usize {
        let mut inner = self.inner.borrow_mut();
        let id = inner.registry.borrow_mut().register(element);
        let now = inner.scheduler.now();
        let inner = &mut *inner;
        let mut surface = PlayerSurface::new(&mut inner.player, &mut inner.dom, now);
        let count = inner.text_stagger.animate_text(Some(id), &mut surface).len();
        inner.ensure_pump();
        count
    }

    /// 元素即将（或已经）从文档移除：解绑它和已注册后代上的全部组件
    pub fn detach(&mut self, element: &HtmlElement) {
        let mut inner = self.inner.borrow_mut();
        let (id, nodes) = {
            let registry = inner.registry.borrow();
            let Some(id) = registry.id_of(element) else {
                return;
            };
            (id, registry.descendants(element))
        };
        inner.detach(id, &nodes);
    }

    /// 页面滚动进度（0–100）
    pub fn progress(&self) -> f64 {
        self.inner.borrow().progress.progress().value()
    }
}

impl Drop for WebEffects {
    fn drop(&mut self) {
        self.listeners.clear();
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.teardown();
        }
        info!("效果服务已卸载");
    }
}
