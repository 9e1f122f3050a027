//! # FX Host
//!
//! `fx-runtime` 的无头宿主：用虚拟时钟和模拟文档回放交互场景。
//!
//! ## 架构说明
//!
//! Host 层负责：
//! - 模拟文档布局与视口（[`SimDom`]）
//! - 定时器与帧调度（[`VirtualScheduler`]）
//! - 相交测量（[`IntersectionRegistry`]）
//! - 把组件产生的效果交给 [`fx_runtime::EffectPlayer`] 播放
//!
//! Host 层不包含效果逻辑，只负责按时间顺序驱动各组件。

pub mod config;
pub mod dom;
pub mod error;
pub mod intersection;
pub mod page;
pub mod scenario;
pub mod scheduler;
pub mod snapshot;

pub use config::{HostConfig, ViewportConfig};
pub use dom::{SimDom, SimNode, SimNodeKind};
pub use error::{HostError, HostResult};
pub use intersection::{IntersectionRegistry, ObserverHandle, ObserverId};
pub use page::Page;
pub use scenario::{Action, Behavior, ElementSpec, GroupSpec, Scenario, ScenarioEvent};
pub use scheduler::VirtualScheduler;
pub use snapshot::{EasterEggSnapshot, ElementSnapshot, GroupSnapshot, PageSnapshot, PageStats};

/// 加载、校验并回放一个场景
pub fn replay(config: &HostConfig, scenario: &Scenario) -> HostResult<PageSnapshot> {
    let mut page = Page::new(config, scenario)?;
    let snapshot = page.run(scenario, config.settle_ms);
    page.shutdown();
    Ok(snapshot)
}
