//! # Geometry 模块
//!
//! 视口、元素矩形与 rootMargin 的几何计算。
//!
//! 约定：`Rect` 总是相对于视口左上角（与 `getBoundingClientRect()` 一致），
//! 文档坐标需要加上 `Viewport::scroll_y` / `scroll_x`。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FxError, FxResult};

/// 二维点
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 轴对齐矩形
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// 矩形中心
    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// 平移
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            left: self.left + dx,
            top: self.top + dy,
            ..*self
        }
    }

    /// 求交集（边缘相接也算相交，结果面积为 0）
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if left <= right && top <= bottom {
            Some(Rect::new(left, top, right - left, bottom - top))
        } else {
            None
        }
    }
}

/// 视口与滚动状态
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// 水平滚动偏移
    #[serde(default)]
    pub scroll_x: f64,
    /// 垂直滚动偏移
    #[serde(default)]
    pub scroll_y: f64,
    /// 视口宽度
    pub width: f64,
    /// 视口高度
    pub height: f64,
    /// 文档总高度（scrollHeight）
    pub document_height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scroll_x: 0.0,
            scroll_y: 0.0,
            width: 1280.0,
            height: 800.0,
            document_height: 800.0,
        }
    }
}

impl Viewport {
    /// 视口自身的矩形（视口坐标系）
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// 最大可滚动距离
    pub fn max_scroll_y(&self) -> f64 {
        (self.document_height - self.height).max(0.0)
    }

    /// 文档坐标矩形 → 视口坐标矩形
    pub fn to_client(&self, document_rect: &Rect) -> Rect {
        document_rect.translated(-self.scroll_x, -self.scroll_y)
    }
}

/// 计算 target 与 root 的相交比例
///
/// 返回 `(is_intersecting, ratio)`。面积为 0 的目标只要与 root 相接，比例记为 1。
pub fn intersection_ratio(target: &Rect, root: &Rect) -> (bool, f64) {
    match target.intersect(root) {
        Some(overlap) => {
            let area = target.area();
            let ratio = if area > 0.0 {
                (overlap.area() / area).clamp(0.0, 1.0)
            } else {
                1.0
            };
            (true, ratio)
        }
        None => (false, 0.0),
    }
}

/// 单个 margin 分量
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarginValue {
    /// 像素
    Px(f64),
    /// 百分比（相对于 root 尺寸）
    Percent(f64),
}

impl MarginValue {
    /// 按基准尺寸解析为像素
    pub fn resolve(self, basis: f64) -> f64 {
        match self {
            MarginValue::Px(px) => px,
            MarginValue::Percent(p) => basis * p / 100.0,
        }
    }

    fn parse(token: &str, input: &str) -> FxResult<Self> {
        let invalid = |message: String| FxError::InvalidRootMargin {
            input: input.to_string(),
            message,
        };

        let (number, make): (&str, fn(f64) -> MarginValue) =
            if let Some(n) = token.strip_suffix("px") {
                (n, MarginValue::Px)
            } else if let Some(n) = token.strip_suffix('%') {
                (n, MarginValue::Percent)
            } else if token == "0" {
                ("0", MarginValue::Px)
            } else {
                return Err(invalid(format!("'{token}' 必须以 px 或 % 结尾")));
            };

        let value: f64 = number
            .parse()
            .map_err(|_| invalid(format!("'{token}' 不是合法数值")))?;
        if !value.is_finite() {
            return Err(invalid(format!("'{token}' 不是有限数值")));
        }
        Ok(make(value))
    }
}

impl fmt::Display for MarginValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarginValue::Px(v) => write!(f, "{}px", css_number(*v)),
            MarginValue::Percent(v) => write!(f, "{}%", css_number(*v)),
        }
    }
}

/// 视口触发框的扩展/收缩量（CSS margin 简写语法）
///
/// 支持 1–4 个分量：`"10px"`、`"10px 20px"`、`"0px 0px -20% 0px"`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RootMargin {
    pub top: MarginValue,
    pub right: MarginValue,
    pub bottom: MarginValue,
    pub left: MarginValue,
}

impl Default for RootMargin {
    fn default() -> Self {
        Self::uniform(MarginValue::Px(0.0))
    }
}

impl RootMargin {
    /// 四边相同
    pub const fn uniform(value: MarginValue) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// 将 margin 应用到 root 矩形上
    pub fn apply(&self, root: &Rect) -> Rect {
        let top = self.top.resolve(root.height);
        let bottom = self.bottom.resolve(root.height);
        let left = self.left.resolve(root.width);
        let right = self.right.resolve(root.width);

        Rect::new(
            root.left - left,
            root.top - top,
            (root.width + left + right).max(0.0),
            (root.height + top + bottom).max(0.0),
        )
    }
}

impl FromStr for RootMargin {
    type Err = FxError;

    fn from_str(input: &str) -> FxResult<Self> {
        let values = input
            .split_whitespace()
            .map(|token| MarginValue::parse(token, input))
            .collect::<FxResult<Vec<_>>>()?;

        match values.as_slice() {
            [all] => Ok(Self::uniform(*all)),
            [vertical, horizontal] => Ok(Self {
                top: *vertical,
                right: *horizontal,
                bottom: *vertical,
                left: *horizontal,
            }),
            [top, horizontal, bottom] => Ok(Self {
                top: *top,
                right: *horizontal,
                bottom: *bottom,
                left: *horizontal,
            }),
            [top, right, bottom, left] => Ok(Self {
                top: *top,
                right: *right,
                bottom: *bottom,
                left: *left,
            }),
            _ => Err(FxError::InvalidRootMargin {
                input: input.to_string(),
                message: format!("需要 1 到 4 个分量，实际 {} 个", values.len()),
            }),
        }
    }
}

impl TryFrom<String> for RootMargin {
    type Error = FxError;

    fn try_from(value: String) -> FxResult<Self> {
        value.parse()
    }
}

impl From<RootMargin> for String {
    fn from(margin: RootMargin) -> Self {
        margin.to_string()
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }
}

/// 按 CSS 习惯格式化数值：整数不带小数点，`-0` 记为 `0`
pub fn css_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersect() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 50.0, 100.0, 100.0);
        assert_eq!(a.intersect(&b), Some(Rect::new(50.0, 50.0, 50.0, 50.0)));

        // 边缘相接
        let c = Rect::new(100.0, 0.0, 10.0, 10.0);
        assert_eq!(a.intersect(&c).map(|r| r.area()), Some(0.0));

        let d = Rect::new(200.0, 200.0, 10.0, 10.0);
        assert_eq!(a.intersect(&d), None);
    }

    #[test]
    fn test_intersection_ratio() {
        let root = Rect::new(0.0, 0.0, 100.0, 100.0);
        let half = Rect::new(0.0, 50.0, 100.0, 100.0);
        assert_eq!(intersection_ratio(&half, &root), (true, 0.5));

        let outside = Rect::new(0.0, 150.0, 100.0, 100.0);
        assert_eq!(intersection_ratio(&outside, &root), (false, 0.0));

        let point = Rect::new(10.0, 10.0, 0.0, 0.0);
        assert_eq!(intersection_ratio(&point, &root), (true, 1.0));
    }

    #[test]
    fn test_root_margin_parse() {
        let m: RootMargin = "10px".parse().unwrap();
        assert_eq!(m, RootMargin::uniform(MarginValue::Px(10.0)));

        let m: RootMargin = "10px 20%".parse().unwrap();
        assert_eq!(m.top, MarginValue::Px(10.0));
        assert_eq!(m.right, MarginValue::Percent(20.0));
        assert_eq!(m.left, MarginValue::Percent(20.0));

        let m: RootMargin = "0px 0px -20% 0".parse().unwrap();
        assert_eq!(m.bottom, MarginValue::Percent(-20.0));
        assert_eq!(m.left, MarginValue::Px(0.0));
    }

    #[test]
    fn test_root_margin_parse_errors() {
        assert!("".parse::<RootMargin>().is_err());
        assert!("10".parse::<RootMargin>().is_err());
        assert!("10em".parse::<RootMargin>().is_err());
        assert!("1px 2px 3px 4px 5px".parse::<RootMargin>().is_err());
        assert!("abcpx".parse::<RootMargin>().is_err());
    }

    #[test]
    fn test_root_margin_apply() {
        let root = Rect::new(0.0, 0.0, 1000.0, 800.0);
        let m: RootMargin = "0px 0px -25% 0px".parse().unwrap();
        let applied = m.apply(&root);
        assert_eq!(applied, Rect::new(0.0, 0.0, 1000.0, 600.0));

        let m: RootMargin = "50px".parse().unwrap();
        assert_eq!(m.apply(&root), Rect::new(-50.0, -50.0, 1100.0, 900.0));
    }

    #[test]
    fn test_root_margin_serde() {
        let m: RootMargin = serde_json::from_str("\"10px 5%\"").unwrap();
        assert_eq!(m.top, MarginValue::Px(10.0));
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "\"10px 5% 10px 5%\"");

        assert!(serde_json::from_str::<RootMargin>("\"oops\"").is_err());
    }

    #[test]
    fn test_css_number() {
        assert_eq!(css_number(425.0), "425");
        assert_eq!(css_number(12.5), "12.5");
        assert_eq!(css_number(-0.0), "0");
        assert_eq!(css_number(-3.0), "-3");
    }
}
