//! # Coalesce 模块
//!
//! 单槽帧合并器：同一时刻最多只有一个待执行的帧回调。
//!
//! 滚动事件的频率远高于屏幕刷新率，所有高频事件只负责"请求"，
//! 真正的计算在帧回调里执行一次。

use crate::platform::{FrameId, Scheduler};

/// 单槽帧合并器
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FrameCoalescer {
    pending: Option<FrameId>,
}

impl FrameCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求一次帧回调
    ///
    /// 已有待执行回调时不做任何事，返回 `false`。
    pub fn request<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.pending = Some(scheduler.request_frame());
        true
    }

    /// 帧回调到达：只接受自己请求的那一帧
    pub fn take(&mut self, frame: FrameId) -> bool {
        if self.pending == Some(frame) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// 取消待执行的回调
    pub fn cancel<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if let Some(frame) = self.pending.take() {
            scheduler.cancel_frame(frame);
        }
    }

    /// 是否有待执行的回调
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// 当前待执行的帧
    pub fn pending(&self) -> Option<FrameId> {
        self.pending
    }
}
