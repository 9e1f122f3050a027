//! # Scenario 模块
//!
//! 回放场景：页面元素、挂载的行为和按时间排列的输入事件。
//!
//! ```json
//! {
//!   "name": "hero",
//!   "document_height": 3000,
//!   "elements": [
//!     { "name": "logo", "rect": { "left": 0, "top": 0, "width": 80, "height": 40 },
//!       "behaviors": [{ "type": "easter_egg" }] }
//!   ],
//!   "events": [{ "at": 100, "type": "click", "target": "logo" }]
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use fx_runtime::{
    Millis, ParallaxOptions, Rect, RevealOptions, VisibilityOptions, scroll::DEFAULT_MOUSE_INTENSITY,
};
use serde::{Deserialize, Serialize};

use crate::config::ViewportConfig;
use crate::error::{HostError, HostResult};

/// 挂在元素上的行为
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Behavior {
    /// 可见性跟踪
    Visibility(VisibilityOptions),
    /// 进入视口时揭示
    Reveal(RevealOptions),
    /// 滚动视差
    Parallax(ParallaxOptions),
    /// 指针视差
    MouseParallax {
        #[serde(default = "default_intensity")]
        intensity: f64,
    },
    /// 多图层视差中的一层
    Layer { speed: f64 },
    /// 点击彩蛋
    EasterEgg,
}

fn default_intensity() -> f64 {
    DEFAULT_MOUSE_INTENSITY
}

/// 页面元素
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub name: String,

    /// 文档坐标
    pub rect: Rect,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub behaviors: Vec<Behavior>,
}

/// 一组共享同一观察者的元素（列表项可见性）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,

    pub members: Vec<String>,

    #[serde(default)]
    pub options: VisibilityOptions,
}

/// 输入动作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// 滚动到绝对位置
    Scroll { y: f64 },
    /// 指针移动（视口坐标）
    PointerMove { x: f64, y: f64 },
    /// 点击元素
    Click { target: String },
    /// 按键（KeyboardEvent.key）
    Key { key: String },
    /// 对元素执行逐字动画
    AnimateText { target: String },
    /// 调整视口尺寸
    Resize { width: f64, height: f64 },
    /// 卸载元素
    Unmount { target: String },
}

impl Action {
    /// 引用的元素名
    pub fn target(&self) -> Option<&str> {
        match self {
            Action::Click { target }
            | Action::AnimateText { target }
            | Action::Unmount { target } => Some(target),
            _ => None,
        }
    }
}

/// 定时事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioEvent {
    /// 虚拟时间（毫秒）
    pub at: Millis,

    #[serde(flatten)]
    pub action: Action,
}

/// 回放场景
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    /// 未指定时使用配置中的视口
    #[serde(default)]
    pub viewport: Option<ViewportConfig>,

    pub document_height: f64,

    #[serde(default)]
    pub elements: Vec<ElementSpec>,

    #[serde(default)]
    pub groups: Vec<GroupSpec>,

    /// 是否挂载滚动进度
    #[serde(default = "default_progress")]
    pub progress: bool,

    #[serde(default)]
    pub events: Vec<ScenarioEvent>,

    /// 回放结束时间，未指定时为最后一个事件加上配置的 settle 时长
    #[serde(default)]
    pub until: Option<Millis>,
}

fn default_progress() -> bool {
    true
}

impl Scenario {
    /// 从 JSON 文件加载
    pub fn load(path: impl AsRef<Path>) -> HostResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| HostError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| HostError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(json: &str) -> HostResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 结构检查：名字唯一、引用存在、事件按时间排列、行为选项有效
    pub fn validate(&self) -> HostResult<()> {
        let fail = |message: String| HostError::scenario(&self.name, message);

        if !(self.document_height.is_finite() && self.document_height >= 0.0) {
            return Err(fail(format!("文档高度无效: {}", self.document_height)));
        }

        let mut names = HashSet::new();
        for element in &self.elements {
            if !names.insert(element.name.as_str()) {
                return Err(fail(format!("元素名重复: {}", element.name)));
            }
            let rect = element.rect;
            if rect.width < 0.0 || rect.height < 0.0 {
                return Err(fail(format!("元素 {} 尺寸为负", element.name)));
            }
            for behavior in &element.behaviors {
                match behavior {
                    Behavior::Visibility(options) => options.validate()?,
                    Behavior::Reveal(options) => options.validate()?,
                    Behavior::Parallax(options) => options.validate()?,
                    Behavior::MouseParallax { intensity } if !intensity.is_finite() => {
                        return Err(fail(format!("元素 {} 的指针视差强度无效", element.name)));
                    }
                    Behavior::Layer { speed } if !speed.is_finite() => {
                        return Err(fail(format!("元素 {} 的图层速度无效", element.name)));
                    }
                    _ => {}
                }
            }
        }

        for group in &self.groups {
            group.options.validate()?;
            if let Some(missing) = group.members.iter().find(|m| !names.contains(m.as_str())) {
                return Err(fail(format!("分组 {} 引用了不存在的元素 {missing}", group.name)));
            }
        }

        let mut last = 0;
        for event in &self.events {
            if event.at < last {
                return Err(fail(format!("事件时间倒序: {} < {last}", event.at)));
            }
            last = event.at;
            if let Some(target) = event.action.target()
                && !names.contains(target)
            {
                return Err(fail(format!("事件引用了不存在的元素 {target}")));
            }
        }

        if let Some(until) = self.until
            && until < last
        {
            return Err(fail(format!("结束时间 {until} 早于最后一个事件 {last}")));
        }
        Ok(())
    }

    /// 最后一个事件的时间
    pub fn last_event_at(&self) -> Millis {
        self.events.last().map_or(0, |event| event.at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "name": "sample",
        "document_height": 3000,
        "elements": [
            { "name": "hero", "rect": { "left": 0, "top": 100, "width": 1280, "height": 600 },
              "behaviors": [
                { "type": "parallax", "speed": 0.3, "direction": "both" },
                { "type": "reveal", "once": false, "threshold": [0, 0.5] }
              ] },
            { "name": "logo", "rect": { "left": 0, "top": 0, "width": 80, "height": 40 },
              "text": "FX",
              "behaviors": [{ "type": "easter_egg" }, { "type": "mouse_parallax" }] }
        ],
        "groups": [{ "name": "cards", "members": ["hero", "logo"] }],
        "events": [
            { "at": 0, "type": "scroll", "y": 200 },
            { "at": 50, "type": "click", "target": "logo" },
            { "at": 60, "type": "key", "key": "ArrowUp" }
        ]
    }"#;

    #[test]
    fn test_parse_sample() {
        let scenario = Scenario::from_json(SAMPLE).unwrap();
        assert!(scenario.validate().is_ok());
        assert!(scenario.progress);
        assert_eq!(scenario.elements[1].behaviors[1], Behavior::MouseParallax {
            intensity: 20.0
        });
        assert_eq!(scenario.events[1].action, Action::Click {
            target: "logo".to_string()
        });
        assert_eq!(scenario.last_event_at(), 60);

        let Behavior::Reveal(options) = &scenario.elements[0].behaviors[1] else {
            panic!("expected reveal");
        };
        assert!(!options.once);
    }

    #[test]
    fn test_validate_rejects_unknown_target() {
        let mut scenario = Scenario::from_json(SAMPLE).unwrap();
        scenario.events.push(ScenarioEvent {
            at: 100,
            action: Action::Unmount {
                target: "footer".to_string(),
            },
        });
        assert!(matches!(
            scenario.validate(),
            Err(HostError::InvalidScenario { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unsorted_events() {
        let mut scenario = Scenario::from_json(SAMPLE).unwrap();
        scenario.events.push(ScenarioEvent {
            at: 10,
            action: Action::Key {
                key: "a".to_string(),
            },
        });
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let json = SAMPLE.replace("[0, 0.5]", "[0, 1.5]");
        let scenario = Scenario::from_json(&json).unwrap();
        assert!(matches!(scenario.validate(), Err(HostError::Options(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let mut scenario = Scenario::from_json(SAMPLE).unwrap();
        let copy = scenario.elements[0].clone();
        scenario.elements.push(copy);
        assert!(scenario.validate().is_err());
    }
}
