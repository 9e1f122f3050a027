//! # Intersection 模块
//!
//! 基于原生 IntersectionObserver 的 [`IntersectionHost`]。
//! 每个组件实例一个观察者，第一次 `observe` 时按请求参数创建。

use std::cell::RefCell;
use std::rc::Rc;

use fx_runtime::{ElementId, IntersectionEntry, IntersectionHost, ObserveRequest};
use js_sys::Array;
use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsValue;
use web_sys::{IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit};

use crate::registry::ElementRegistry;
use crate::scheduler::{Wake, WakeFn};

type ObserverCallback = Closure<dyn FnMut(Array, IntersectionObserver)>;

pub struct WebIntersectionHost {
    key: usize,
    registry: Rc<RefCell<ElementRegistry>>,
    wake: WakeFn,
    observer: Option<(IntersectionObserver, ObserverCallback)>,
}

impl WebIntersectionHost {
    pub fn new(key: usize, registry: Rc<RefCell<ElementRegistry>>, wake: WakeFn) -> Self {
        Self {
            key,
            registry,
            wake,
            observer: None,
        }
    }

    fn create_observer(
        &self,
        request: &ObserveRequest,
    ) -> Result<(IntersectionObserver, ObserverCallback), JsValue> {
        let key = self.key;
        let registry = Rc::clone(&self.registry);
        let wake = Rc::clone(&self.wake);
        let callback: ObserverCallback = Closure::new(move |entries: Array, _: IntersectionObserver| {
            let batch: Vec<IntersectionEntry> = {
                let registry = registry.borrow();
                entries
                    .iter()
                    .filter_map(|value| {
                        let entry: IntersectionObserverEntry = value.unchecked_into();
                        let target = registry.id_of(&entry.target())?;
                        Some(IntersectionEntry::new(
                            target,
                            entry.is_intersecting(),
                            entry.intersection_ratio(),
                        ))
                    })
                    .collect()
            };
            if !batch.is_empty() {
                wake(Wake::Intersections {
                    observer: key,
                    entries: batch,
                });
            }
        });

        let init = IntersectionObserverInit::new();
        init.set_root_margin(&request.root_margin.to_string());
        let thresholds: Array = request
            .thresholds
            .iter()
            .map(|t| JsValue::from_f64(*t))
            .collect();
        init.set_threshold(&thresholds);

        let observer =
            IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)?;
        Ok((observer, callback))
    }
}

impl IntersectionHost for WebIntersectionHost {
    fn observe(&mut self, target: ElementId, request: &ObserveRequest) {
        let Some(element) = self.registry.borrow().get(target).cloned() else {
            warn!(element = %target, "观察目标未注册");
            return;
        };
        if self.observer.is_none() {
            match self.create_observer(request) {
                Ok(observer) => self.observer = Some(observer),
                Err(e) => {
                    warn!(error = ?e, "创建 IntersectionObserver 失败");
                    return;
                }
            }
        }
        if let Some((observer, _)) = &self.observer {
            observer.observe(&element);
        }
    }

    fn unobserve(&mut self, target: ElementId) {
        let element = self.registry.borrow().get(target).cloned();
        if let (Some((observer, _)), Some(element)) = (&self.observer, element) {
            observer.unobserve(&element);
        }
    }

    fn disconnect(&mut self) {
        if let Some((observer, _)) = self.observer.take() {
            observer.disconnect();
        }
    }
}
