//! # FX Web
//!
//! `fx-runtime` 的浏览器宿主。
//!
//! 把运行时的能力接口接到真实 DOM 上：
//!
//! - [`WebScheduler`]：`setTimeout` / `requestAnimationFrame`
//! - [`WebIntersectionHost`]：`IntersectionObserver`
//! - [`WebDom`]：节点创建、样式写入、逐字拆分
//! - [`WebEffects`]：页面级服务，统一持有组件与全局监听
//!
//! ```ignore
//! let mut effects = WebEffects::install(50)?;
//! effects.reveal(&hero, RevealOptions::default())?;
//! effects.easter_egg(&logo, EasterEggConfig::default(), 42)?;
//!
//! // 移除元素前解绑
//! effects.detach(&hero);
//! hero.remove();
//! ```

pub mod dom;
pub mod effects;
pub mod intersection;
pub mod registry;
pub mod scheduler;

pub use dom::WebDom;
pub use effects::{GroupHandle, Visibility, VisibilityHandle, WebEffects};
pub use intersection::WebIntersectionHost;
pub use registry::ElementRegistry;
pub use scheduler::{Wake, WakeFn, WebScheduler};
