//! # Style 模块
//!
//! 可动画属性与样式合成。
//!
//! 同一元素上的多个动画属性（平移、旋转）合成为一条 `transform`，
//! 与 anime.js 的合成方式一致：`translateX → translateY → rotate`。

use serde::{Deserialize, Serialize};

use crate::platform::StyleProperty;

/// 可动画的属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnimProperty {
    /// 透明度
    Opacity,
    /// 水平平移（px）
    TranslateX,
    /// 垂直平移（px）
    TranslateY,
    /// 旋转（deg）
    Rotate,
    /// 色相旋转滤镜（deg）
    HueRotate,
}

impl AnimProperty {
    /// 属性最终写入的样式
    pub fn style_property(&self) -> StyleProperty {
        match self {
            AnimProperty::Opacity => StyleProperty::Opacity,
            AnimProperty::TranslateX | AnimProperty::TranslateY | AnimProperty::Rotate => {
                StyleProperty::Transform
            }
            AnimProperty::HueRotate => StyleProperty::Filter,
        }
    }
}

/// 单个元素的动画样式状态
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StyleState {
    pub opacity: Option<f32>,
    pub translate_x: Option<f32>,
    pub translate_y: Option<f32>,
    pub rotate: Option<f32>,
    pub hue_rotate: Option<f32>,
}

impl StyleState {
    /// 设置属性值
    pub fn set(&mut self, property: AnimProperty, value: f32) {
        let slot = match property {
            AnimProperty::Opacity => &mut self.opacity,
            AnimProperty::TranslateX => &mut self.translate_x,
            AnimProperty::TranslateY => &mut self.translate_y,
            AnimProperty::Rotate => &mut self.rotate,
            AnimProperty::HueRotate => &mut self.hue_rotate,
        };
        *slot = Some(value);
    }

    /// 所有属性都未设置
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// 清除属性值
    pub fn clear(&mut self, property: AnimProperty) {
        match property {
            AnimProperty::Opacity => self.opacity = None,
            AnimProperty::TranslateX => self.translate_x = None,
            AnimProperty::TranslateY => self.translate_y = None,
            AnimProperty::Rotate => self.rotate = None,
            AnimProperty::HueRotate => self.hue_rotate = None,
        }
    }

    /// 读取属性值
    pub fn get(&self, property: AnimProperty) -> Option<f32> {
        match property {
            AnimProperty::Opacity => self.opacity,
            AnimProperty::TranslateX => self.translate_x,
            AnimProperty::TranslateY => self.translate_y,
            AnimProperty::Rotate => self.rotate,
            AnimProperty::HueRotate => self.hue_rotate,
        }
    }

    /// 合成 `transform` 值
    pub fn transform_css(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(x) = self.translate_x {
            parts.push(format!("translateX({}px)", css_f32(x)));
        }
        if let Some(y) = self.translate_y {
            parts.push(format!("translateY({}px)", css_f32(y)));
        }
        if let Some(r) = self.rotate {
            parts.push(format!("rotate({}deg)", css_f32(r)));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    /// 某个样式属性当前应写入的 CSS 值
    pub fn css_value(&self, property: StyleProperty) -> Option<String> {
        match property {
            StyleProperty::Transform => self.transform_css(),
            StyleProperty::Opacity => self.opacity.map(css_f32),
            StyleProperty::Filter => self
                .hue_rotate
                .map(|deg| format!("hue-rotate({}deg)", css_f32(deg))),
            StyleProperty::Display => None,
        }
    }
}

/// f32 版本的 CSS 数值格式化（最短表示，`-0` 记为 `0`）
fn css_f32(value: f32) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{value}")
}
