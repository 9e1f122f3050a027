//! 元素注册表：`ElementId` ↔ DOM 元素

use std::collections::HashMap;

use fx_runtime::ElementId;
use web_sys::{Element, HtmlElement, Node};

#[derive(Debug, Default)]
pub struct ElementRegistry {
    next_id: u64,
    elements: HashMap<ElementId, HtmlElement>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 分配一个不绑定元素的 ID（创建节点失败时使用）
    pub fn reserve(&mut self) -> ElementId {
        self.next_id += 1;
        ElementId(self.next_id)
    }

    /// 注册元素；同一元素重复注册返回同一个 ID
    pub fn register(&mut self, element: &HtmlElement) -> ElementId {
        if let Some(id) = self.id_of(element) {
            return id;
        }
        let id = self.reserve();
        self.elements.insert(id, element.clone());
        id
    }

    pub fn id_of(&self, element: &Element) -> Option<ElementId> {
        self.elements
            .iter()
            .find(|(_, candidate)| {
                let candidate: &Element = candidate;
                candidate == element
            })
            .map(|(id, _)| *id)
    }

    /// 元素自身及其已注册的后代
    pub fn descendants(&self, root: &Element) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|(_, candidate)| {
                let node: &Node = candidate;
                root.contains(Some(node))
            })
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn get(&self, id: ElementId) -> Option<&HtmlElement> {
        self.elements.get(&id)
    }

    pub fn remove(&mut self, id: ElementId) -> Option<HtmlElement> {
        self.elements.remove(&id)
    }
}
