//! # Scheduler 模块
//!
//! 虚拟时钟调度器：定时器与帧请求都由 [`crate::Page`] 按虚拟时间驱动。

use std::collections::BTreeMap;

use fx_runtime::{FrameId, Millis, Scheduler, TimerId};

/// 虚拟调度器
///
/// 定时器按 (到期时间, 创建顺序) 排序；同一时刻到期的定时器按创建顺序触发。
#[derive(Debug, Default)]
pub struct VirtualScheduler {
    now: Millis,
    next_id: u64,
    timers: BTreeMap<(Millis, u64), TimerId>,
    frame_requests: Vec<FrameId>,
    frames_requested: u64,
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// 推进虚拟时间，不允许倒退
    pub fn set_now(&mut self, now: Millis) {
        self.now = self.now.max(now);
    }

    /// 最早到期的定时器
    pub fn next_timer_due(&self) -> Option<Millis> {
        self.timers.keys().next().map(|(due, _)| *due)
    }

    /// 取出所有到期（`due <= now`）的定时器
    pub fn pop_due_timers(&mut self, now: Millis) -> Vec<TimerId> {
        let pending = self.timers.split_off(&(now + 1, 0));
        let due = std::mem::replace(&mut self.timers, pending);
        due.into_values().collect()
    }

    /// 取出本帧需要回调的帧请求
    pub fn take_frame_requests(&mut self) -> Vec<FrameId> {
        std::mem::take(&mut self.frame_requests)
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn pending_frames(&self) -> usize {
        self.frame_requests.len()
    }

    /// 累计帧请求数
    pub fn frames_requested(&self) -> u64 {
        self.frames_requested
    }
}

impl Scheduler for VirtualScheduler {
    fn now(&self) -> Millis {
        self.now
    }

    fn set_timeout(&mut self, delay: Millis) -> TimerId {
        let seq = self.alloc();
        let id = TimerId(seq);
        self.timers.insert((self.now + delay, seq), id);
        id
    }

    fn clear_timeout(&mut self, id: TimerId) {
        self.timers.retain(|_, timer| *timer != id);
    }

    fn request_frame(&mut self) -> FrameId {
        let id = FrameId(self.alloc());
        self.frame_requests.push(id);
        self.frames_requested += 1;
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        self.frame_requests.retain(|frame| *frame != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timers_fire_in_order() {
        let mut scheduler = VirtualScheduler::new();
        let late = scheduler.set_timeout(300);
        let early = scheduler.set_timeout(100);
        let same = scheduler.set_timeout(100);
        assert_eq!(scheduler.next_timer_due(), Some(100));

        assert!(scheduler.pop_due_timers(99).is_empty());
        assert_eq!(scheduler.pop_due_timers(100), vec![early, same]);
        assert_eq!(scheduler.next_timer_due(), Some(300));

        scheduler.clear_timeout(late);
        assert_eq!(scheduler.pending_timers(), 0);
        assert_eq!(scheduler.next_timer_due(), None);
    }

    #[test]
    fn test_timeout_relative_to_now() {
        let mut scheduler = VirtualScheduler::new();
        scheduler.set_now(1000);
        scheduler.set_timeout(2000);
        assert_eq!(scheduler.next_timer_due(), Some(3000));

        // 时间不倒退
        scheduler.set_now(10);
        assert_eq!(scheduler.now(), 1000);
    }

    #[test]
    fn test_frame_requests() {
        let mut scheduler = VirtualScheduler::new();
        let a = scheduler.request_frame();
        let b = scheduler.request_frame();
        scheduler.cancel_frame(a);
        assert_eq!(scheduler.take_frame_requests(), vec![b]);
        assert_eq!(scheduler.pending_frames(), 0);
        assert_eq!(scheduler.frames_requested(), 2);
    }
}
