//! # Dom 模块
//!
//! 无头模拟文档：节点树、布局矩形、内联样式与视口。

use std::collections::{BTreeMap, HashMap};

use fx_runtime::{DomOps, ElementId, NodeKind, Rect, StyleProperty, Viewport};
use tracing::trace;

/// 节点来源
#[derive(Debug, Clone, PartialEq)]
pub enum SimNodeKind {
    /// 场景中声明的页面元素
    Page { name: String },
    /// 效果创建的节点
    Generated(NodeKind),
    /// 逐字动画拆出的字符
    Char,
}

/// 模拟节点
#[derive(Debug, Clone)]
pub struct SimNode {
    pub kind: SimNodeKind,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    /// 文档坐标下的布局，只有页面元素有
    pub layout: Option<Rect>,
    pub text: String,
    pub styles: BTreeMap<StyleProperty, String>,
}

impl SimNode {
    fn new(kind: SimNodeKind, parent: Option<ElementId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            layout: None,
            text: String::new(),
            styles: BTreeMap::new(),
        }
    }
}

/// 模拟文档
#[derive(Debug)]
pub struct SimDom {
    nodes: HashMap<ElementId, SimNode>,
    names: HashMap<String, ElementId>,
    next_id: u64,
    viewport: Viewport,
    generated_total: usize,
}

impl SimDom {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            nodes: HashMap::new(),
            names: HashMap::new(),
            next_id: 1,
            viewport,
            generated_total: 0,
        }
    }

    fn alloc(&mut self) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        id
    }

    /// 添加页面元素
    pub fn add_element(&mut self, name: &str, layout: Rect, text: &str) -> ElementId {
        let id = self.alloc();
        let mut node = SimNode::new(
            SimNodeKind::Page {
                name: name.to_string(),
            },
            None,
        );
        node.layout = Some(layout);
        node.text = text.to_string();
        self.nodes.insert(id, node);
        self.names.insert(name.to_string(), id);
        id
    }

    /// 按名字查找仍在文档中的元素
    pub fn element_by_name(&self, name: &str) -> Option<ElementId> {
        self.names
            .get(name)
            .copied()
            .filter(|id| self.nodes.contains_key(id))
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: ElementId) -> Option<&SimNode> {
        self.nodes.get(&id)
    }

    /// 元素当前的视口坐标矩形（getBoundingClientRect）
    pub fn client_rect(&self, id: ElementId) -> Option<Rect> {
        let layout = self.nodes.get(&id)?.layout?;
        Some(self.viewport.to_client(&layout))
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// 滚动到指定位置，限制在可滚动范围内
    pub fn scroll_to(&mut self, y: f64) {
        self.viewport.scroll_y = y.clamp(0.0, self.viewport.max_scroll_y());
    }

    /// 调整视口尺寸，滚动位置重新限制
    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.width = width;
        self.viewport.height = height;
        self.scroll_to(self.viewport.scroll_y);
    }

    pub fn style(&self, id: ElementId, property: StyleProperty) -> Option<&str> {
        self.nodes
            .get(&id)?
            .styles
            .get(&property)
            .map(String::as_str)
    }

    /// 当前文档中的节点数
    pub fn live_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// 当前文档中由效果创建的节点数
    pub fn live_generated(&self) -> usize {
        self.nodes
            .values()
            .filter(|node| matches!(node.kind, SimNodeKind::Generated(_)))
            .count()
    }

    /// 累计由效果创建的节点数
    pub fn generated_total(&self) -> usize {
        self.generated_total
    }

    /// 移除节点及其全部后代，返回被移除的 ID（后代在前）
    pub fn detach(&mut self, id: ElementId) -> Vec<ElementId> {
        let Some(parent) = self.nodes.get(&id).map(|node| node.parent) else {
            return Vec::new();
        };
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|child| *child != id);
        }
        let mut removed = Vec::new();
        self.collect_subtree(id, &mut removed);
        for node in &removed {
            self.nodes.remove(node);
        }
        trace!(node = %id, removed = removed.len(), "节点已移除");
        removed
    }

    fn collect_subtree(&self, id: ElementId, out: &mut Vec<ElementId>) {
        if let Some(node) = self.nodes.get(&id) {
            for child in &node.children {
                self.collect_subtree(*child, out);
            }
            out.push(id);
        }
    }
}

impl DomOps for SimDom {
    fn create_node(&mut self, kind: &NodeKind, parent: Option<ElementId>) -> ElementId {
        let id = self.alloc();
        let parent = parent.filter(|p| self.nodes.contains_key(p));
        if let Some(node) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            node.children.push(id);
        }
        let mut node = SimNode::new(SimNodeKind::Generated(kind.clone()), parent);
        if let NodeKind::Notification { message } = kind {
            node.text = message.clone();
        }
        self.nodes.insert(id, node);
        self.generated_total += 1;
        id
    }

    fn remove_node(&mut self, node: ElementId) {
        self.detach(node);
    }

    fn write_style(&mut self, node: ElementId, property: StyleProperty, value: &str) {
        let Some(node) = self.nodes.get_mut(&node) else {
            return;
        };
        if value.is_empty() {
            node.styles.remove(&property);
        } else {
            node.styles.insert(property, value.to_string());
        }
    }

    fn text_content(&self, node: ElementId) -> Option<String> {
        let node = self.nodes.get(&node)?;
        if node.children.is_empty() {
            return Some(node.text.clone());
        }
        let mut text = String::new();
        for child in &node.children {
            if let Some(child_text) = self.text_content(*child) {
                text.push_str(&child_text);
            }
        }
        Some(text)
    }

    fn replace_with_chars(&mut self, node: ElementId, chars: &[String]) -> Vec<ElementId> {
        let Some(children) = self.nodes.get(&node).map(|n| n.children.clone()) else {
            return Vec::new();
        };
        for child in children {
            self.detach(child);
        }

        let mut created = Vec::with_capacity(chars.len());
        for ch in chars {
            let id = self.alloc();
            let mut char_node = SimNode::new(SimNodeKind::Char, Some(node));
            char_node.text = ch.clone();
            self.nodes.insert(id, char_node);
            created.push(id);
        }
        if let Some(parent) = self.nodes.get_mut(&node) {
            parent.text.clear();
            parent.children = created.clone();
        }
        created
    }

    fn viewport_height(&self) -> f64 {
        self.viewport.height
    }
}
