//! # Snapshot 模块
//!
//! 回放结束时的页面状态，可输出为 JSON 或文本摘要。

use std::collections::BTreeMap;
use std::fmt;

use fx_runtime::{ClickOutcome, Millis, StyleProperty};
use serde::Serialize;

/// 页面快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSnapshot {
    pub scenario: String,
    pub time: Millis,
    pub scroll_y: f64,
    /// 未挂载滚动进度时为 `None`
    pub progress: Option<f64>,
    pub elements: Vec<ElementSnapshot>,
    pub groups: Vec<GroupSnapshot>,
    pub easter_egg: EasterEggSnapshot,
    pub stats: PageStats,
}

/// 单个页面元素的状态
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementSnapshot {
    pub name: String,
    pub mounted: bool,
    /// 可见性跟踪或揭示动画给出的可见性
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_triggered: Option<bool>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub styles: BTreeMap<StyleProperty, String>,
    /// 逐字动画拆出的字符数
    #[serde(skip_serializing_if = "is_zero")]
    pub chars: usize,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

/// 分组可见性
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSnapshot {
    pub name: String,
    pub states: Vec<bool>,
}

/// 彩蛋状态
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EasterEggSnapshot {
    pub click_count: u32,
    pub active: bool,
    pub konami_progress: Vec<String>,
    pub konami_matches: u32,
    pub clicks: Vec<ClickOutcome>,
}

/// 运行统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageStats {
    pub frames: u64,
    pub frame_requests: u64,
    pub parallax_recomputations: u64,
    pub layer_recomputations: u64,
    pub generated_nodes: usize,
    pub live_generated_nodes: usize,
    pub active_effects: usize,
    pub pending_timers: usize,
}

impl fmt::Display for PageSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "场景: {} @ {}ms", self.scenario, self.time)?;
        write!(f, "滚动: {}", self.scroll_y)?;
        if let Some(progress) = self.progress {
            write!(f, " ({progress:.1}%)")?;
        }
        writeln!(f)?;

        for element in &self.elements {
            write!(f, "  {}", element.name)?;
            if !element.mounted {
                write!(f, " [已卸载]")?;
            }
            if let Some(visible) = element.visible {
                write!(f, " visible={visible}")?;
            }
            if element.has_triggered == Some(true) {
                write!(f, " triggered")?;
            }
            for (property, value) in &element.styles {
                write!(f, " {property}: {value};")?;
            }
            if element.chars > 0 {
                write!(f, " chars={}", element.chars)?;
            }
            writeln!(f)?;
        }

        for group in &self.groups {
            let states: Vec<&str> = group
                .states
                .iter()
                .map(|visible| if *visible { "●" } else { "○" })
                .collect();
            writeln!(f, "  [{}] {}", group.name, states.join(" "))?;
        }

        let egg = &self.easter_egg;
        writeln!(
            f,
            "彩蛋: clicks={} active={} konami={}/{}",
            egg.click_count,
            egg.active,
            egg.konami_progress.len(),
            egg.konami_matches
        )?;

        let stats = &self.stats;
        write!(
            f,
            "统计: frames={} requests={} parallax={} layers={} nodes={}/{} effects={} timers={}",
            stats.frames,
            stats.frame_requests,
            stats.parallax_recomputations,
            stats.layer_recomputations,
            stats.live_generated_nodes,
            stats.generated_nodes,
            stats.active_effects,
            stats.pending_timers
        )
    }
}
