//! # Dom 模块
//!
//! 真实 DOM 上的 [`DomOps`]，效果创建的节点挂在 `document.body` 下。

use std::cell::RefCell;
use std::rc::Rc;

use fx_runtime::{DomOps, ElementId, NodeKind, Rect, StyleProperty, Viewport};
use tracing::warn;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, HtmlElement, Window};

use crate::registry::ElementRegistry;

const CONFETTI_CONTAINER_CLASS: &str = "confetti-container fixed inset-0 pointer-events-none z-[9998]";
const CONFETTI_CLASS: &str = "confetti absolute w-3 h-3 rounded-full";
const NOTIFICATION_CLASS: &str = "fixed top-24 left-1/2 transform -translate-x-1/2 z-[9999] px-6 py-3 \
     bg-gradient-to-r from-primary-500 to-accent-500 text-white rounded-full shadow-2xl \
     font-semibold text-lg";

pub struct WebDom {
    window: Window,
    document: Document,
    registry: Rc<RefCell<ElementRegistry>>,
}

impl WebDom {
    pub fn new(window: Window, document: Document, registry: Rc<RefCell<ElementRegistry>>) -> Self {
        Self {
            window,
            document,
            registry,
        }
    }

    fn create_html(&self, tag: &str) -> Option<HtmlElement> {
        self.document
            .create_element(tag)
            .ok()
            .and_then(|element| element.dyn_into::<HtmlElement>().ok())
    }

    /// 元素的视口坐标矩形
    pub fn client_rect(&self, id: ElementId) -> Option<Rect> {
        let registry = self.registry.borrow();
        let rect = registry.get(id)?.get_bounding_client_rect();
        Some(Rect::new(rect.left(), rect.top(), rect.width(), rect.height()))
    }

    /// 当前视口与滚动状态
    pub fn viewport(&self) -> Viewport {
        let number = |value: Result<JsValue, JsValue>| {
            value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
        };
        let document_height = self
            .document
            .document_element()
            .map_or(0.0, |root| f64::from(root.scroll_height()));
        Viewport {
            scroll_x: self.window.scroll_x().unwrap_or(0.0),
            scroll_y: self.window.scroll_y().unwrap_or(0.0),
            width: number(self.window.inner_width()),
            height: number(self.window.inner_height()),
            document_height,
        }
    }
}

impl DomOps for WebDom {
    fn create_node(&mut self, kind: &NodeKind, parent: Option<ElementId>) -> ElementId {
        let Some(element) = self.create_html("div") else {
            warn!("创建节点失败");
            return self.registry.borrow_mut().reserve();
        };

        match kind {
            NodeKind::ConfettiContainer => element.set_class_name(CONFETTI_CONTAINER_CLASS),
            NodeKind::ConfettiParticle {
                color,
                left_percent,
            } => {
                element.set_class_name(CONFETTI_CLASS);
                let style = element.style();
                let left = format!("{left_percent}%");
                for (property, value) in [
                    ("background-color", color.as_str()),
                    ("left", left.as_str()),
                    ("top", "-10px"),
                ] {
                    if let Err(e) = style.set_property(property, value) {
                        warn!(error = ?e, property, "写入彩纸样式失败");
                    }
                }
            }
            NodeKind::Notification { message } => {
                element.set_class_name(NOTIFICATION_CLASS);
                element.set_text_content(Some(message));
            }
        }

        let parent = parent.and_then(|id| self.registry.borrow().get(id).cloned());
        let appended = match parent {
            Some(parent) => parent.append_child(&element),
            None => match self.document.body() {
                Some(body) => body.append_child(&element),
                None => Err(JsValue::from_str("document.body 不存在")),
            },
        };
        if let Err(e) = appended {
            warn!(error = ?e, "挂载节点失败");
        }
        self.registry.borrow_mut().register(&element)
    }

    fn remove_node(&mut self, node: ElementId) {
        if let Some(element) = self.registry.borrow_mut().remove(node) {
            element.remove();
        }
    }

    fn write_style(&mut self, node: ElementId, property: StyleProperty, value: &str) {
        let registry = self.registry.borrow();
        let Some(element) = registry.get(node) else {
            return;
        };
        let style = element.style();
        let result = if value.is_empty() {
            style.remove_property(property.as_css()).map(|_| ())
        } else {
            style.set_property(property.as_css(), value)
        };
        if let Err(e) = result {
            warn!(error = ?e, property = %property, "写入样式失败");
        }
    }

    fn text_content(&self, node: ElementId) -> Option<String> {
        self.registry.borrow().get(node)?.text_content()
    }

    fn replace_with_chars(&mut self, node: ElementId, chars: &[String]) -> Vec<ElementId> {
        let Some(element) = self.registry.borrow().get(node).cloned() else {
            return Vec::new();
        };
        element.set_text_content(None);

        let mut created = Vec::with_capacity(chars.len());
        for ch in chars {
            let Some(span) = self.create_html("span") else {
                continue;
            };
            span.set_text_content(Some(ch));
            if element.append_child(&span).is_ok() {
                created.push(self.registry.borrow_mut().register(&span));
            }
        }
        created
    }

    fn viewport_height(&self) -> f64 {
        self.window
            .inner_height()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    }
}
