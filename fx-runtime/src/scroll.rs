//! # Scroll 模块
//!
//! 滚动与指针驱动的视差、进度计算。
//!
//! - [`ScrollParallax`]：元素相对视差，帧合并
//! - [`ScrollProgress`]：页面滚动进度（0–100）
//! - [`MouseParallax`]：指针相对元素中心的偏移
//! - [`MultiLayerParallax`]：多图层视差，直接写样式
//!
//! 所有几何输入都由 Host 在计算时刻提供（`Viewport` + 元素视口坐标矩形），
//! 元素不存在时传 `None`，组件静默跳过。

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::coalesce::FrameCoalescer;
use crate::error::{FxResult, ensure_finite};
use crate::geometry::{Point, Rect, Viewport, css_number};
use crate::observable::Observable;
use crate::platform::{EffectSurface, ElementId, FrameId, Scheduler, StyleProperty};

/// 视差方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParallaxDirection {
    #[default]
    Vertical,
    Horizontal,
    Both,
}

impl ParallaxDirection {
    /// 格式化为 transform
    pub fn format(&self, value: f64) -> String {
        let v = css_number(value);
        match self {
            ParallaxDirection::Vertical => format!("translateY({v}px)"),
            ParallaxDirection::Horizontal => format!("translateX({v}px)"),
            ParallaxDirection::Both => format!("translate({v}px, {v}px)"),
        }
    }
}

/// 视差选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallaxOptions {
    /// 速度系数
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// 方向
    #[serde(default)]
    pub direction: ParallaxDirection,

    /// 偏移量（px）
    #[serde(default)]
    pub offset: f64,
}

impl Default for ParallaxOptions {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            direction: ParallaxDirection::default(),
            offset: 0.0,
        }
    }
}

fn default_speed() -> f64 {
    0.5
}

impl ParallaxOptions {
    pub fn validate(&self) -> FxResult<()> {
        ensure_finite("speed", self.speed)?;
        ensure_finite("offset", self.offset)
    }
}

/// 计算视差偏移
///
/// `rect` 为元素的视口坐标矩形。元素不在视口内时返回 `None`。
pub fn parallax_value(options: &ParallaxOptions, viewport: &Viewport, rect: &Rect) -> Option<f64> {
    let scroll_y = viewport.scroll_y;
    let element_top = rect.top + scroll_y;
    let in_view =
        scroll_y + viewport.height > element_top && scroll_y < element_top + rect.height;
    if !in_view {
        return None;
    }
    let scrolled = scroll_y - element_top + viewport.height;
    Some((scrolled - options.offset) * options.speed)
}

/// 元素滚动视差
#[derive(Debug)]
pub struct ScrollParallax {
    options: ParallaxOptions,
    element: Option<ElementId>,
    transform: Observable<String>,
    coalescer: FrameCoalescer,
    live: bool,
    recomputations: u64,
}

impl ScrollParallax {
    pub fn new(options: ParallaxOptions) -> FxResult<Self> {
        options.validate()?;
        Ok(Self {
            options,
            element: None,
            transform: Observable::new(String::new()),
            coalescer: FrameCoalescer::new(),
            live: false,
            recomputations: 0,
        })
    }

    /// 挂载并立即计算一次
    pub fn mount(&mut self, element: Option<ElementId>, viewport: &Viewport, rect: Option<Rect>) {
        self.element = element;
        self.live = true;
        self.recompute(viewport, rect);
    }

    /// 滚动事件：最多保留一个待执行的重算
    pub fn on_scroll<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) -> bool {
        if !self.live {
            return false;
        }
        self.coalescer.request(scheduler)
    }

    /// 帧回调：只处理自己请求的帧
    pub fn on_frame(&mut self, frame: FrameId, viewport: &Viewport, rect: Option<Rect>) -> bool {
        if !self.coalescer.take(frame) || !self.live {
            return false;
        }
        self.recompute(viewport, rect);
        true
    }

    fn recompute(&mut self, viewport: &Viewport, rect: Option<Rect>) {
        if self.element.is_none() {
            return;
        }
        let Some(rect) = rect else {
            return;
        };
        self.recomputations += 1;
        // 不在视口内时保留上一次的值
        if let Some(value) = parallax_value(&self.options, viewport, &rect) {
            self.transform.set(self.options.direction.format(value));
        }
    }

    /// 卸载：取消待执行的帧，之后的帧回调无效
    pub fn unmount<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        self.live = false;
        self.coalescer.cancel(scheduler);
    }

    pub fn transform(&self) -> &Observable<String> {
        &self.transform
    }

    pub fn element(&self) -> Option<ElementId> {
        self.element
    }

    /// 实际执行的重算次数
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    /// 是否有待执行的帧
    pub fn is_pending(&self) -> bool {
        self.coalescer.is_pending()
    }
}

/// 页面滚动进度
#[derive(Debug)]
pub struct ScrollProgress {
    progress: Observable<f64>,
    live: bool,
}

impl Default for ScrollProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrollProgress {
    pub fn new() -> Self {
        Self {
            progress: Observable::new(0.0),
            live: false,
        }
    }

    /// 滚动进度，限制在 `[0, 100]`；文档不可滚动时为 0
    pub fn compute(viewport: &Viewport) -> f64 {
        let max = viewport.document_height - viewport.height;
        if max <= 0.0 {
            return 0.0;
        }
        (viewport.scroll_y / max * 100.0).clamp(0.0, 100.0)
    }

    pub fn mount(&mut self, viewport: &Viewport) {
        self.live = true;
        self.progress.set(Self::compute(viewport));
    }

    /// 计算量很小，每次滚动都直接更新
    pub fn on_scroll(&mut self, viewport: &Viewport) {
        if self.live {
            self.progress.set(Self::compute(viewport));
        }
    }

    pub fn unmount(&mut self) {
        self.live = false;
    }

    pub fn progress(&self) -> &Observable<f64> {
        &self.progress
    }
}

/// 指针视差
#[derive(Debug)]
pub struct MouseParallax {
    intensity: f64,
    element: Option<ElementId>,
    transform: Observable<String>,
    live: bool,
}

/// 指针视差默认强度
pub const DEFAULT_MOUSE_INTENSITY: f64 = 20.0;

impl MouseParallax {
    pub fn new(intensity: f64) -> FxResult<Self> {
        ensure_finite("intensity", intensity)?;
        Ok(Self {
            intensity,
            element: None,
            transform: Observable::new(String::new()),
            live: false,
        })
    }

    pub fn mount(&mut self, element: Option<ElementId>) {
        self.element = element;
        self.live = true;
    }

    /// 指针移动：每个事件都立即计算，不做帧合并
    ///
    /// 元素尺寸为 0 时跳过。
    pub fn on_pointer_move(&mut self, pointer: Point, rect: Option<Rect>) {
        if !self.live || self.element.is_none() {
            return;
        }
        let Some(rect) = rect else {
            return;
        };
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        let center = rect.center();
        let move_x = (pointer.x - center.x) / rect.width * self.intensity;
        let move_y = (pointer.y - center.y) / rect.height * self.intensity;
        self.transform.set(format!(
            "translate({}px, {}px)",
            css_number(move_x),
            css_number(move_y)
        ));
    }

    pub fn unmount(&mut self) {
        self.live = false;
    }

    pub fn transform(&self) -> &Observable<String> {
        &self.transform
    }

    pub fn element(&self) -> Option<ElementId> {
        self.element
    }
}

/// 图层句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(pub usize);

/// 视差图层
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParallaxLayer {
    pub element: Option<ElementId>,
    pub speed: f64,
}

/// 多图层视差
///
/// 每帧把 `translateY(scroll_y * speed px)` 直接写到各图层元素上，
/// 结果不作为可读状态暴露。
#[derive(Debug, Default)]
pub struct MultiLayerParallax {
    layers: Vec<ParallaxLayer>,
    coalescer: FrameCoalescer,
    live: bool,
    recomputations: u64,
}

impl MultiLayerParallax {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册图层，元素稍后通过 [`bind`](Self::bind) 绑定
    pub fn add_layer(&mut self, speed: f64) -> FxResult<LayerId> {
        ensure_finite("speed", speed)?;
        self.layers.push(ParallaxLayer {
            element: None,
            speed,
        });
        Ok(LayerId(self.layers.len() - 1))
    }

    /// 绑定/解绑图层元素
    pub fn bind(&mut self, layer: LayerId, element: Option<ElementId>) {
        if let Some(entry) = self.layers.get_mut(layer.0) {
            entry.element = element;
        }
    }

    pub fn mount(&mut self) {
        self.live = true;
        debug!(layers = self.layers.len(), "多图层视差已挂载");
    }

    pub fn on_scroll<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) -> bool {
        if !self.live {
            return false;
        }
        self.coalescer.request(scheduler)
    }

    pub fn on_frame<E: EffectSurface + ?Sized>(
        &mut self,
        frame: FrameId,
        scroll_y: f64,
        surface: &mut E,
    ) -> bool {
        if !self.coalescer.take(frame) || !self.live {
            return false;
        }
        self.recomputations += 1;
        for layer in &self.layers {
            if let Some(element) = layer.element {
                let value = format!("translateY({}px)", css_number(scroll_y * layer.speed));
                surface.set_style(element, StyleProperty::Transform, &value);
            }
        }
        true
    }

    pub fn unmount<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        self.live = false;
        self.coalescer.cancel(scheduler);
    }

    pub fn layers(&self) -> &[ParallaxLayer] {
        &self.layers
    }

    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ManualScheduler, RecordingSurface};

    fn viewport(scroll_y: f64) -> Viewport {
        Viewport {
            scroll_y,
            height: 800.0,
            document_height: 3000.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_parallax_reference_value() {
        let options = ParallaxOptions::default();
        // 文档位置 50 → 滚动 100 后视口坐标为 -50
        let rect = Rect::new(0.0, -50.0, 400.0, 300.0);
        let value = parallax_value(&options, &viewport(100.0), &rect);
        assert_eq!(value, Some(425.0));
        assert_eq!(options.direction.format(425.0), "translateY(425px)");
    }

    #[test]
    fn test_direction_format() {
        insta::assert_snapshot!(ParallaxDirection::Horizontal.format(-12.5), @"translateX(-12.5px)");
        insta::assert_snapshot!(ParallaxDirection::Both.format(3.0), @"translate(3px, 3px)");
    }

    #[test]
    fn test_out_of_view_keeps_previous() {
        let mut parallax = ScrollParallax::new(ParallaxOptions::default()).unwrap();
        let mut scheduler = ManualScheduler::default();
        parallax.mount(
            Some(ElementId(1)),
            &viewport(100.0),
            Some(Rect::new(0.0, -50.0, 400.0, 300.0)),
        );
        assert_eq!(parallax.transform().get(), "translateY(425px)");

        parallax.on_scroll(&mut scheduler);
        let frame = scheduler.take_frames()[0];
        // 元素已经滚出视口上方
        assert!(parallax.on_frame(
            frame,
            &viewport(2000.0),
            Some(Rect::new(0.0, -1950.0, 400.0, 300.0))
        ));
        assert_eq!(parallax.transform().get(), "translateY(425px)");
        assert_eq!(parallax.recomputations(), 2);
    }

    #[test]
    fn test_scroll_burst_coalesces() {
        let mut parallax = ScrollParallax::new(ParallaxOptions::default()).unwrap();
        let mut scheduler = ManualScheduler::default();
        let rect = Rect::new(0.0, 100.0, 400.0, 300.0);
        parallax.mount(Some(ElementId(1)), &viewport(0.0), Some(rect));

        let scheduled = (0..25).filter(|_| parallax.on_scroll(&mut scheduler)).count();
        assert_eq!(scheduled, 1);
        assert_eq!(scheduler.frames_requested, 1);

        let frames = scheduler.take_frames();
        assert_eq!(frames.len(), 1);
        assert!(parallax.on_frame(frames[0], &viewport(10.0), Some(rect)));
        // 同一帧重复送达不会再算一次
        assert!(!parallax.on_frame(frames[0], &viewport(10.0), Some(rect)));
        assert_eq!(parallax.recomputations(), 2);
    }

    #[test]
    fn test_missing_element_is_noop() {
        let mut parallax = ScrollParallax::new(ParallaxOptions::default()).unwrap();
        parallax.mount(None, &viewport(0.0), None);
        assert_eq!(parallax.transform().get(), "");
        assert_eq!(parallax.recomputations(), 0);
    }

    #[test]
    fn test_frame_after_unmount_is_noop() {
        let mut parallax = ScrollParallax::new(ParallaxOptions::default()).unwrap();
        let mut scheduler = ManualScheduler::default();
        let rect = Rect::new(0.0, 100.0, 400.0, 300.0);
        parallax.mount(Some(ElementId(1)), &viewport(0.0), Some(rect));
        parallax.on_scroll(&mut scheduler);
        let frame = scheduler.pending_frames[0];

        parallax.unmount(&mut scheduler);
        assert_eq!(scheduler.cancelled_frames, vec![frame]);
        assert!(!parallax.on_frame(frame, &viewport(50.0), Some(rect)));
        assert!(!parallax.on_scroll(&mut scheduler));
    }

    #[test]
    fn test_invalid_options() {
        let options = ParallaxOptions {
            speed: f64::NAN,
            ..Default::default()
        };
        assert!(ScrollParallax::new(options).is_err());
    }

    #[test]
    fn test_scroll_progress() {
        let mut progress = ScrollProgress::new();
        progress.mount(&viewport(0.0));
        assert_eq!(progress.progress().value(), 0.0);

        progress.on_scroll(&viewport(1100.0));
        assert_eq!(progress.progress().value(), 50.0);

        // 回弹越界
        progress.on_scroll(&viewport(2500.0));
        assert_eq!(progress.progress().value(), 100.0);

        let short = Viewport {
            document_height: 600.0,
            ..viewport(0.0)
        };
        assert_eq!(ScrollProgress::compute(&short), 0.0);
    }

    #[test]
    fn test_mouse_parallax() {
        let mut mouse = MouseParallax::new(DEFAULT_MOUSE_INTENSITY).unwrap();
        let rect = Rect::new(100.0, 100.0, 200.0, 100.0);

        mouse.on_pointer_move(Point::new(0.0, 0.0), Some(rect));
        assert_eq!(mouse.transform().get(), "");

        mouse.mount(Some(ElementId(1)));
        mouse.on_pointer_move(Point::new(300.0, 150.0), Some(rect));
        assert_eq!(mouse.transform().get(), "translate(10px, 0px)");

        mouse.on_pointer_move(Point::new(150.0, 100.0), Some(rect));
        assert_eq!(mouse.transform().get(), "translate(-5px, -10px)");
    }

    #[test]
    fn test_multi_layer() {
        let mut layers = MultiLayerParallax::new();
        let mut scheduler = ManualScheduler::default();
        let mut surface = RecordingSurface::default();

        let back = layers.add_layer(0.2).unwrap();
        let front = layers.add_layer(0.8).unwrap();
        let _unbound = layers.add_layer(0.5).unwrap();
        layers.bind(back, Some(ElementId(1)));
        layers.bind(front, Some(ElementId(2)));

        assert!(!layers.on_scroll(&mut scheduler));
        layers.mount();
        assert!(layers.on_scroll(&mut scheduler));
        assert!(!layers.on_scroll(&mut scheduler));

        let frame = scheduler.take_frames()[0];
        assert!(layers.on_frame(frame, 500.0, &mut surface));
        assert_eq!(surface.styles.len(), 2);
        assert_eq!(
            surface.last_style(ElementId(1), StyleProperty::Transform),
            Some("translateY(100px)")
        );
        assert_eq!(
            surface.last_style(ElementId(2), StyleProperty::Transform),
            Some("translateY(400px)")
        );
    }
}
