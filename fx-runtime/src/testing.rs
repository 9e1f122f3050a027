//! 单元测试用的记录型能力实现

use std::collections::{BTreeMap, HashMap};

use crate::effect::EffectSpec;
use crate::platform::{
    EffectHandle, EffectSurface, ElementId, FrameId, IntersectionHost, Millis, ObserveRequest,
    Scheduler, StyleProperty, TimerId,
};

/// 手动推进时间的调度器
#[derive(Debug, Default)]
pub struct ManualScheduler {
    pub now: Millis,
    next_id: u64,
    /// 未触发的定时器：ID → 到期时间
    pub timers: BTreeMap<TimerId, Millis>,
    pub cleared_timers: Vec<TimerId>,
    pub frames_requested: usize,
    pub pending_frames: Vec<FrameId>,
    pub cancelled_frames: Vec<FrameId>,
}

impl ManualScheduler {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// 推进时间，返回到期的定时器（按到期时间排序）
    pub fn advance(&mut self, delta: Millis) -> Vec<TimerId> {
        self.now += delta;
        let now = self.now;
        let mut fired: Vec<(Millis, TimerId)> = self
            .timers
            .iter()
            .filter(|(_, due)| **due <= now)
            .map(|(id, due)| (*due, *id))
            .collect();
        fired.sort();
        for (_, id) in &fired {
            self.timers.remove(id);
        }
        fired.into_iter().map(|(_, id)| id).collect()
    }

    /// 取走所有待执行的帧
    pub fn take_frames(&mut self) -> Vec<FrameId> {
        std::mem::take(&mut self.pending_frames)
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Millis {
        self.now
    }

    fn set_timeout(&mut self, delay: Millis) -> TimerId {
        let id = TimerId(self.next());
        self.timers.insert(id, self.now + delay);
        id
    }

    fn clear_timeout(&mut self, id: TimerId) {
        if self.timers.remove(&id).is_some() {
            self.cleared_timers.push(id);
        }
    }

    fn request_frame(&mut self) -> FrameId {
        let id = FrameId(self.next());
        self.frames_requested += 1;
        self.pending_frames.push(id);
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        self.pending_frames.retain(|f| *f != id);
        self.cancelled_frames.push(id);
    }
}

/// 记录所有副作用的表面
#[derive(Debug)]
pub struct RecordingSurface {
    next_handle: u64,
    next_node: u64,
    pub effects: Vec<(EffectHandle, EffectSpec)>,
    pub cancelled: Vec<EffectHandle>,
    pub styles: Vec<(ElementId, StyleProperty, String)>,
    pub texts: HashMap<ElementId, String>,
    pub replaced: Vec<(ElementId, Vec<String>)>,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self {
            next_handle: 0,
            next_node: 1000,
            effects: Vec::new(),
            cancelled: Vec::new(),
            styles: Vec::new(),
            texts: HashMap::new(),
            replaced: Vec::new(),
        }
    }
}

impl RecordingSurface {
    /// 已提交效果的名称序列
    pub fn effect_names(&self) -> Vec<&'static str> {
        self.effects.iter().map(|(_, spec)| spec.name()).collect()
    }

    /// 元素某个样式的最后一次写入
    pub fn last_style(&self, element: ElementId, property: StyleProperty) -> Option<&str> {
        self.styles
            .iter()
            .rev()
            .find(|(e, p, _)| *e == element && *p == property)
            .map(|(_, _, v)| v.as_str())
    }
}

impl EffectSurface for RecordingSurface {
    fn create_visual_effect(&mut self, spec: EffectSpec) -> EffectHandle {
        self.next_handle += 1;
        let handle = EffectHandle(self.next_handle);
        self.effects.push((handle, spec));
        handle
    }

    fn cancel(&mut self, handle: EffectHandle) {
        self.cancelled.push(handle);
    }

    fn set_style(&mut self, target: ElementId, property: StyleProperty, value: &str) {
        self.styles.push((target, property, value.to_string()));
    }

    fn text_content(&self, target: ElementId) -> Option<String> {
        self.texts.get(&target).cloned()
    }

    fn replace_with_chars(&mut self, target: ElementId, chars: &[String]) -> Vec<ElementId> {
        self.replaced.push((target, chars.to_vec()));
        chars
            .iter()
            .map(|_| {
                self.next_node += 1;
                ElementId(self.next_node)
            })
            .collect()
    }
}

/// 记录观察请求的相交观察器
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub observed: BTreeMap<ElementId, ObserveRequest>,
    pub unobserved: Vec<ElementId>,
    pub disconnects: usize,
}

impl IntersectionHost for RecordingObserver {
    fn observe(&mut self, target: ElementId, request: &ObserveRequest) {
        self.observed.insert(target, request.clone());
    }

    fn unobserve(&mut self, target: ElementId) {
        self.observed.remove(&target);
        self.unobserved.push(target);
    }

    fn disconnect(&mut self) {
        self.observed.clear();
        self.disconnects += 1;
    }
}
