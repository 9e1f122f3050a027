//! # Visibility 模块
//!
//! 元素可见性追踪。
//!
//! ## 模式
//!
//! - `once = true`：第一次相交后停止观察，`is_visible` 不会再回到 `false`
//! - `once = false`：持续观察，离开视口时 `is_visible` 置回 `false`
//!
//! ## 相交判定
//!
//! [`ObservationState`] 实现阈值跨越判定，供没有原生 IntersectionObserver
//! 的 Host（headless 模拟）使用：只有"越过的阈值数"或"是否相交"发生变化时
//! 才产生回调条目，第一次观察总是产生条目。

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FxError, FxResult};
use crate::geometry::{Rect, RootMargin, Viewport, intersection_ratio};
use crate::observable::Observable;
use crate::platform::{ElementId, IntersectionEntry, IntersectionHost, ObserveRequest};

/// 可见阈值：单个值或升序断点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    Single(f64),
    Steps(Vec<f64>),
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold::Single(0.1)
    }
}

impl Threshold {
    /// 校验：非空且每个值都在 `[0, 1]`
    pub fn validate(&self) -> FxResult<()> {
        let values = match self {
            Threshold::Single(v) => std::slice::from_ref(v),
            Threshold::Steps(steps) => steps.as_slice(),
        };
        if values.is_empty() {
            return Err(FxError::EmptyThreshold);
        }
        for &value in values {
            if !(0.0..=1.0).contains(&value) {
                return Err(FxError::ThresholdOutOfRange { value });
            }
        }
        Ok(())
    }

    /// 升序去重后的断点列表
    pub fn to_sorted(&self) -> Vec<f64> {
        let mut values = match self {
            Threshold::Single(v) => vec![*v],
            Threshold::Steps(steps) => steps.clone(),
        };
        values.sort_by(f64::total_cmp);
        values.dedup();
        values
    }
}

/// 阈值跨越判定状态（每个被观察元素一个）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObservationState {
    previous: Option<(usize, bool)>,
}

impl ObservationState {
    /// 输入最新几何结果，返回需要派发的 `is_intersecting`
    ///
    /// `touching` 为几何上是否相接，`ratio` 为相交比例。
    pub fn update(&mut self, thresholds: &[f64], touching: bool, ratio: f64) -> Option<bool> {
        let current = crossing(thresholds, touching, ratio);
        if self.previous == Some(current) {
            return None;
        }
        self.previous = Some(current);
        Some(current.1)
    }
}

/// 计算 (越过的阈值数, 是否算作相交)
fn crossing(thresholds: &[f64], touching: bool, ratio: f64) -> (usize, bool) {
    if !touching {
        return (0, false);
    }
    if thresholds.is_empty() {
        return (1, true);
    }
    let index = thresholds.iter().filter(|t| **t <= ratio).count();
    (index, index > 0)
}

/// 按观察请求计算目标（视口坐标）与视口的相交情况
pub fn measure(request: &ObserveRequest, target: &Rect, viewport: &Viewport) -> (bool, f64) {
    let root = request.root_margin.apply(&viewport.bounds());
    intersection_ratio(target, &root)
}

/// 可见性选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityOptions {
    /// 可见阈值
    #[serde(default)]
    pub threshold: Threshold,

    /// 触发框扩展量
    #[serde(default)]
    pub root_margin: RootMargin,

    /// 第一次可见后停止观察
    #[serde(default = "default_once")]
    pub once: bool,

    /// 首次回调前的初始可见性
    #[serde(default)]
    pub immediate: bool,
}

impl Default for VisibilityOptions {
    fn default() -> Self {
        Self {
            threshold: Threshold::default(),
            root_margin: RootMargin::default(),
            once: default_once(),
            immediate: false,
        }
    }
}

fn default_once() -> bool {
    true
}

impl VisibilityOptions {
    pub fn validate(&self) -> FxResult<()> {
        self.threshold.validate()
    }

    /// 转换为观察请求
    pub fn observe_request(&self) -> ObserveRequest {
        ObserveRequest {
            thresholds: self.threshold.to_sorted(),
            root_margin: self.root_margin.clone(),
        }
    }
}

/// 可见性变化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// 相交回调（每次都会产生，即使已经可见）
    Entered,
    /// 离开视口（仅持续模式）
    Left,
    /// 无变化
    Unchanged,
}

/// 被观察元素
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservedElement {
    pub element: ElementId,
    pub is_visible: bool,
    pub has_triggered: bool,
    /// 是否仍在观察中
    pub observing: bool,
}

impl ObservedElement {
    pub fn new(element: ElementId, initially_visible: bool) -> Self {
        Self {
            element,
            is_visible: initially_visible,
            has_triggered: false,
            observing: true,
        }
    }

    /// 应用一次回调；`once` 模式下第一次相交后停止观察
    pub fn apply(&mut self, is_intersecting: bool, once: bool) -> Transition {
        if !self.observing {
            return Transition::Unchanged;
        }
        if is_intersecting {
            self.is_visible = true;
            self.has_triggered = true;
            if once {
                self.observing = false;
            }
            Transition::Entered
        } else if !once {
            self.is_visible = false;
            Transition::Left
        } else {
            Transition::Unchanged
        }
    }
}

/// 单元素可见性追踪器
#[derive(Debug)]
pub struct VisibilityTracker {
    options: VisibilityOptions,
    observed: Option<ObservedElement>,
    is_visible: Observable<bool>,
    has_triggered: Observable<bool>,
    torn_down: bool,
}

impl VisibilityTracker {
    pub fn new(options: VisibilityOptions) -> FxResult<Self> {
        options.validate()?;
        Ok(Self {
            is_visible: Observable::new(options.immediate),
            has_triggered: Observable::new(false),
            options,
            observed: None,
            torn_down: false,
        })
    }

    /// 绑定元素并开始观察
    ///
    /// 元素不存在时什么也不做，等待下一次调用。
    pub fn attach<H: IntersectionHost + ?Sized>(
        &mut self,
        element: Option<ElementId>,
        host: &mut H,
    ) -> bool {
        let Some(element) = element else {
            return false;
        };
        if self.torn_down {
            return false;
        }
        if let Some(previous) = self.observed.take() {
            if previous.element == element {
                self.observed = Some(previous);
                return true;
            }
            if previous.observing {
                host.unobserve(previous.element);
            }
        }

        host.observe(element, &self.options.observe_request());
        self.observed = Some(ObservedElement::new(element, self.options.immediate));
        debug!(element = %element, once = self.options.once, "开始观察可见性");
        true
    }

    /// 处理一批相交回调
    pub fn handle_entries<H: IntersectionHost + ?Sized>(
        &mut self,
        entries: &[IntersectionEntry],
        host: &mut H,
    ) {
        if self.torn_down {
            return;
        }
        let Some(observed) = self.observed.as_mut() else {
            return;
        };

        let element = observed.element;
        for entry in entries.iter().filter(|e| e.target == element) {
            let transition = observed.apply(entry.is_intersecting, self.options.once);
            if transition == Transition::Entered && !observed.observing {
                host.unobserve(observed.element);
            }
            if transition != Transition::Unchanged {
                self.is_visible.set(observed.is_visible);
                self.has_triggered.set(observed.has_triggered);
            }
        }
    }

    /// 停止全部观察，之后的回调不再生效
    pub fn teardown<H: IntersectionHost + ?Sized>(&mut self, host: &mut H) {
        host.disconnect();
        if let Some(observed) = self.observed.as_mut() {
            observed.observing = false;
        }
        self.torn_down = true;
    }

    pub fn is_visible(&self) -> &Observable<bool> {
        &self.is_visible
    }

    pub fn has_triggered(&self) -> &Observable<bool> {
        &self.has_triggered
    }

    pub fn element(&self) -> Option<ElementId> {
        self.observed.map(|o| o.element)
    }

    /// 是否仍在观察
    pub fn is_observing(&self) -> bool {
        self.observed.is_some_and(|o| o.observing)
    }

    pub fn options(&self) -> &VisibilityOptions {
        &self.options
    }
}

/// 多元素可见性追踪器（共享一个观察器）
#[derive(Debug)]
pub struct MultiVisibilityTracker {
    options: VisibilityOptions,
    refs: Vec<Option<ElementId>>,
    observed: Vec<Option<ObservedElement>>,
    states: Vec<bool>,
    mounted: bool,
    torn_down: bool,
}

impl MultiVisibilityTracker {
    /// `immediate` 对多元素追踪器不生效，初始状态全部为不可见
    pub fn new(count: usize, options: VisibilityOptions) -> FxResult<Self> {
        options.validate()?;
        Ok(Self {
            options,
            refs: vec![None; count],
            observed: vec![None; count],
            states: vec![false; count],
            mounted: false,
            torn_down: false,
        })
    }

    /// 记录第 `index` 个元素
    ///
    /// 只记录引用，观察在 [`mount`](Self::mount) 时统一开始。
    pub fn set_ref(&mut self, index: usize, element: Option<ElementId>) {
        if index >= self.refs.len() {
            self.refs.resize(index + 1, None);
            self.observed.resize(index + 1, None);
            self.states.resize(index + 1, false);
        }
        self.refs[index] = element;
    }

    /// 观察所有已记录的元素
    pub fn mount<H: IntersectionHost + ?Sized>(&mut self, host: &mut H) {
        if self.mounted || self.torn_down {
            return;
        }
        self.mounted = true;
        let request = self.options.observe_request();
        for (slot, element) in self.observed.iter_mut().zip(&self.refs) {
            if let Some(element) = element {
                host.observe(*element, &request);
                *slot = Some(ObservedElement::new(*element, false));
            }
        }
        debug!(count = self.refs.iter().flatten().count(), "开始观察多个元素");
    }

    /// 处理一批相交回调，按元素身份映射回下标
    pub fn handle_entries<H: IntersectionHost + ?Sized>(
        &mut self,
        entries: &[IntersectionEntry],
        host: &mut H,
    ) {
        if self.torn_down {
            return;
        }
        for entry in entries {
            let Some(index) = self.refs.iter().position(|r| *r == Some(entry.target)) else {
                continue;
            };
            let Some(observed) = self.observed[index].as_mut() else {
                continue;
            };
            let transition = observed.apply(entry.is_intersecting, self.options.once);
            if transition == Transition::Entered && !observed.observing {
                host.unobserve(observed.element);
            }
            self.states[index] = observed.is_visible;
        }
    }

    pub fn teardown<H: IntersectionHost + ?Sized>(&mut self, host: &mut H) {
        host.disconnect();
        self.torn_down = true;
    }

    /// 各元素的可见性
    pub fn visibility_states(&self) -> &[bool] {
        &self.states
    }

    pub fn refs(&self) -> &[Option<ElementId>] {
        &self.refs
    }
}
