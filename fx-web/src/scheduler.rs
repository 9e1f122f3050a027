//! # Scheduler 模块
//!
//! 基于 `setTimeout` / `requestAnimationFrame` 的调度器。
//!
//! 浏览器回调通过 [`Wake`] 汇总到同一个入口，由 [`crate::WebEffects`]
//! 分发给各组件；组件只认自己持有的 ID。

use std::collections::HashMap;
use std::rc::Rc;

use fx_runtime::{FrameId, IntersectionEntry, Millis, Scheduler, TimerId};
use gloo::render::{AnimationFrame, request_animation_frame};
use gloo::timers::callback::Timeout;

/// 浏览器回调
#[derive(Debug, Clone)]
pub enum Wake {
    Timer(TimerId),
    Frame(FrameId),
    /// 第 `observer` 个观察者的相交条目
    Intersections {
        observer: usize,
        entries: Vec<IntersectionEntry>,
    },
}

/// 回调入口
pub type WakeFn = Rc<dyn Fn(Wake)>;

/// 页面时钟（毫秒，`performance.now()`）
pub(crate) fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|window| window.performance())
        .map_or_else(js_sys::Date::now, |performance| performance.now())
}

pub struct WebScheduler {
    next_id: u64,
    origin: f64,
    timers: HashMap<TimerId, Timeout>,
    frames: HashMap<FrameId, AnimationFrame>,
    // 已触发的句柄延后到下一次回调开始时再释放
    spent_timers: Vec<Timeout>,
    spent_frames: Vec<AnimationFrame>,
    wake: WakeFn,
}

impl WebScheduler {
    pub fn new(wake: WakeFn) -> Self {
        Self {
            next_id: 0,
            origin: now_ms(),
            timers: HashMap::new(),
            frames: HashMap::new(),
            spent_timers: Vec::new(),
            spent_frames: Vec::new(),
            wake,
        }
    }

    fn alloc(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// 释放之前回调中已触发的句柄
    pub fn release_spent(&mut self) {
        self.spent_timers.clear();
        self.spent_frames.clear();
    }

    /// 定时器已触发
    pub fn retire_timer(&mut self, id: TimerId) {
        if let Some(timeout) = self.timers.remove(&id) {
            self.spent_timers.push(timeout);
        }
    }

    /// 帧已触发
    pub fn retire_frame(&mut self, id: FrameId) {
        if let Some(frame) = self.frames.remove(&id) {
            self.spent_frames.push(frame);
        }
    }

    /// 取消全部待执行的定时器和帧
    pub fn clear(&mut self) {
        self.timers.clear();
        self.frames.clear();
        self.release_spent();
    }
}

impl Scheduler for WebScheduler {
    fn now(&self) -> Millis {
        (now_ms() - self.origin).max(0.0) as Millis
    }

    fn set_timeout(&mut self, delay: Millis) -> TimerId {
        let id = TimerId(self.alloc());
        let wake = Rc::clone(&self.wake);
        let delay = u32::try_from(delay).unwrap_or(u32::MAX);
        let timeout = Timeout::new(delay, move || wake(Wake::Timer(id)));
        self.timers.insert(id, timeout);
        id
    }

    fn clear_timeout(&mut self, id: TimerId) {
        // Timeout 析构时取消
        self.timers.remove(&id);
    }

    fn request_frame(&mut self) -> FrameId {
        let id = FrameId(self.alloc());
        let wake = Rc::clone(&self.wake);
        let frame = request_animation_frame(move |_timestamp| wake(Wake::Frame(id)));
        self.frames.insert(id, frame);
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        self.frames.remove(&id);
    }
}
