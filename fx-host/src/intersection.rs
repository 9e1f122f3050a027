//! # Intersection 模块
//!
//! 模拟 IntersectionObserver：每个组件实例拥有一个观察者，
//! 每帧按当前布局和视口重新测量，只在阈值区间变化时产生条目。

use std::collections::BTreeMap;

use fx_runtime::visibility::measure;
use fx_runtime::{
    ElementId, IntersectionEntry, IntersectionHost, ObservationState, ObserveRequest,
};

use crate::dom::SimDom;

/// 观察者 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub usize);

#[derive(Debug)]
struct Observation {
    request: ObserveRequest,
    state: ObservationState,
}

/// 所有观察者的注册表
#[derive(Debug, Default)]
pub struct IntersectionRegistry {
    observers: Vec<BTreeMap<ElementId, Observation>>,
}

impl IntersectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_observer(&mut self) -> ObserverId {
        self.observers.push(BTreeMap::new());
        ObserverId(self.observers.len() - 1)
    }

    /// 以指定观察者身份提供 [`IntersectionHost`]
    pub fn host(&mut self, observer: ObserverId) -> ObserverHandle<'_> {
        ObserverHandle {
            registry: self,
            observer,
        }
    }

    /// 指定观察者当前观察的元素数
    pub fn observed_count(&self, observer: ObserverId) -> usize {
        self.observers.get(observer.0).map_or(0, BTreeMap::len)
    }

    /// 重新测量全部观察目标，返回每个观察者的新条目
    ///
    /// 新观察的目标第一次测量总会产生条目；已不在文档中的目标跳过。
    pub fn compute(&mut self, dom: &SimDom) -> Vec<(ObserverId, Vec<IntersectionEntry>)> {
        let viewport = dom.viewport();
        let mut batches = Vec::new();
        for (index, targets) in self.observers.iter_mut().enumerate() {
            let mut entries = Vec::new();
            for (target, observation) in targets.iter_mut() {
                let Some(rect) = dom.client_rect(*target) else {
                    continue;
                };
                let (touching, ratio) = measure(&observation.request, &rect, &viewport);
                if let Some(is_intersecting) =
                    observation
                        .state
                        .update(&observation.request.thresholds, touching, ratio)
                {
                    entries.push(IntersectionEntry::new(*target, is_intersecting, ratio));
                }
            }
            if !entries.is_empty() {
                batches.push((ObserverId(index), entries));
            }
        }
        batches
    }
}

/// 单个观察者的句柄
pub struct ObserverHandle<'a> {
    registry: &'a mut IntersectionRegistry,
    observer: ObserverId,
}

impl IntersectionHost for ObserverHandle<'_> {
    fn observe(&mut self, target: ElementId, request: &ObserveRequest) {
        if let Some(targets) = self.registry.observers.get_mut(self.observer.0) {
            targets.insert(
                target,
                Observation {
                    request: request.clone(),
                    state: ObservationState::default(),
                },
            );
        }
    }

    fn unobserve(&mut self, target: ElementId) {
        if let Some(targets) = self.registry.observers.get_mut(self.observer.0) {
            targets.remove(&target);
        }
    }

    fn disconnect(&mut self) {
        if let Some(targets) = self.registry.observers.get_mut(self.observer.0) {
            targets.clear();
        }
    }
}
