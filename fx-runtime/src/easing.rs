//! # Easing 模块
//!
//! 动画时间插值曲线。
//!
//! 序列化名称与 anime.js 一致（`"easeOutCubic"` 等）。每族曲线只定义缓入形式，
//! 缓出与缓入缓出由缓入镜像得到：
//!
//! ```text
//! out(t)   = 1 - in(1 - t)
//! inOut(t) = in(2t) / 2              (t < 0.5)
//!          = 1 - in(2 - 2t) / 2      (t >= 0.5)
//! ```

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

/// 缓动函数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EasingFunction {
    Linear,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    #[default]
    EaseOutCubic,
    EaseInOutCubic,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    EaseOutElastic,
    EaseOutBounce,
}

/// 曲线族
#[derive(Clone, Copy)]
enum Curve {
    Quad,
    Cubic,
    Sine,
    Elastic,
    Bounce,
}

#[derive(Clone, Copy)]
enum Mode {
    In,
    Out,
    InOut,
}

impl Curve {
    /// 缓入形式
    fn ease_in(self, t: f32) -> f32 {
        match self {
            Curve::Quad => t * t,
            Curve::Cubic => t * t * t,
            Curve::Sine => 1.0 - (t * PI / 2.0).cos(),
            Curve::Elastic => elastic_in(t),
            Curve::Bounce => bounce_in(t),
        }
    }

    fn eval(self, mode: Mode, t: f32) -> f32 {
        match mode {
            Mode::In => self.ease_in(t),
            Mode::Out => 1.0 - self.ease_in(1.0 - t),
            Mode::InOut if t < 0.5 => self.ease_in(t * 2.0) / 2.0,
            Mode::InOut => 1.0 - self.ease_in(2.0 - t * 2.0) / 2.0,
        }
    }
}

impl EasingFunction {
    fn parts(self) -> Option<(Curve, Mode)> {
        use EasingFunction::*;
        Some(match self {
            Linear => return None,
            EaseInQuad => (Curve::Quad, Mode::In),
            EaseOutQuad => (Curve::Quad, Mode::Out),
            EaseInOutQuad => (Curve::Quad, Mode::InOut),
            EaseInCubic => (Curve::Cubic, Mode::In),
            EaseOutCubic => (Curve::Cubic, Mode::Out),
            EaseInOutCubic => (Curve::Cubic, Mode::InOut),
            EaseInSine => (Curve::Sine, Mode::In),
            EaseOutSine => (Curve::Sine, Mode::Out),
            EaseInOutSine => (Curve::Sine, Mode::InOut),
            EaseOutElastic => (Curve::Elastic, Mode::Out),
            EaseOutBounce => (Curve::Bounce, Mode::Out),
        })
    }

    /// 把线性进度 `t`（会被限制到 0..=1）映射为缓动进度
    ///
    /// 弹性曲线中途会越过 1.0。
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self.parts() {
            Some((curve, mode)) => curve.eval(mode, t),
            None => t,
        }
    }
}

/// 振幅 1、周期 0.5 的弹性曲线
fn elastic_in(t: f32) -> f32 {
    const PERIOD: f32 = 0.5;
    if t == 0.0 || t == 1.0 {
        return t;
    }
    let shift = PERIOD / (2.0 * PI) * 1.0_f32.asin();
    -(2.0_f32).powf(10.0 * (t - 1.0)) * (((t - 1.0) - shift) * 2.0 * PI / PERIOD).sin()
}

/// 四段弹跳（anime.js 的分段写法）
fn bounce_in(t: f32) -> f32 {
    let mut exponent = 4;
    let mut pow2;
    loop {
        exponent -= 1;
        pow2 = 2.0_f32.powi(exponent);
        if t >= (pow2 - 1.0) / 11.0 {
            break;
        }
    }
    1.0 / 4.0_f32.powi(3 - exponent) - 7.5625 * ((pow2 * 3.0 - 2.0) / 22.0 - t).powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [EasingFunction; 12] = [
        EasingFunction::Linear,
        EasingFunction::EaseInQuad,
        EasingFunction::EaseOutQuad,
        EasingFunction::EaseInOutQuad,
        EasingFunction::EaseInCubic,
        EasingFunction::EaseOutCubic,
        EasingFunction::EaseInOutCubic,
        EasingFunction::EaseInSine,
        EasingFunction::EaseOutSine,
        EasingFunction::EaseInOutSine,
        EasingFunction::EaseOutElastic,
        EasingFunction::EaseOutBounce,
    ];

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_every_curve_starts_at_zero_and_ends_at_one() {
        for easing in ALL {
            assert!(close(easing.apply(0.0), 0.0), "{easing:?} at 0");
            assert!(close(easing.apply(1.0), 1.0), "{easing:?} at 1");
        }
    }

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(EasingFunction::Linear.apply(-0.5), 0.0);
        assert_eq!(EasingFunction::EaseInQuad.apply(2.0), 1.0);
    }

    #[test]
    fn test_out_mirrors_in() {
        let t = 0.3;
        let ease_in = EasingFunction::EaseInCubic.apply(1.0 - t);
        let ease_out = EasingFunction::EaseOutCubic.apply(t);
        assert!(close(ease_out, 1.0 - ease_in));
        assert!(close(EasingFunction::EaseOutCubic.apply(0.5), 0.875));
    }

    #[test]
    fn test_in_out_is_symmetric_around_midpoint() {
        for easing in [
            EasingFunction::EaseInOutQuad,
            EasingFunction::EaseInOutCubic,
            EasingFunction::EaseInOutSine,
        ] {
            assert!(close(easing.apply(0.5), 0.5), "{easing:?}");
            let a = easing.apply(0.2);
            let b = easing.apply(0.8);
            assert!(close(a + b, 1.0), "{easing:?}");
        }
        assert!(close(EasingFunction::EaseInOutQuad.apply(0.25), 0.125));
    }

    #[test]
    fn test_bounce_segments() {
        // 最后一段之前已经落地过三次
        let easing = EasingFunction::EaseOutBounce;
        assert!(close(easing.apply(1.0 / 2.75), 1.0));
        assert!(easing.apply(0.5) < 1.0);
    }

    #[test]
    fn test_elastic_overshoots() {
        let peak = (1..100)
            .map(|i| EasingFunction::EaseOutElastic.apply(i as f32 / 100.0))
            .fold(f32::MIN, f32::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&EasingFunction::EaseInOutQuad).unwrap();
        assert_eq!(json, "\"easeInOutQuad\"");
        let parsed: EasingFunction = serde_json::from_str("\"easeOutBounce\"").unwrap();
        assert_eq!(parsed, EasingFunction::EaseOutBounce);
    }
}
