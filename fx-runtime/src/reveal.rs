//! # Reveal 模块
//!
//! 进入视口时的淡入/位移动画，以及逐字交错显示。

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::easing::EasingFunction;
use crate::effect::{Delay, EffectSpec, Tween, defaults};
use crate::error::FxResult;
use crate::geometry::RootMargin;
use crate::observable::Observable;
use crate::platform::{
    EffectSurface, ElementId, IntersectionEntry, IntersectionHost, Millis, ObserveRequest,
    StyleProperty,
};
use crate::style::AnimProperty;
use crate::visibility::{ObservedElement, Threshold, Transition};

/// 揭示动画选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevealOptions {
    #[serde(default)]
    pub threshold: Threshold,

    #[serde(default)]
    pub root_margin: RootMargin,

    #[serde(default = "default_once")]
    pub once: bool,
}

impl Default for RevealOptions {
    fn default() -> Self {
        Self {
            threshold: Threshold::default(),
            root_margin: RootMargin::default(),
            once: default_once(),
        }
    }
}

fn default_once() -> bool {
    true
}

impl RevealOptions {
    pub fn validate(&self) -> FxResult<()> {
        self.threshold.validate()
    }

    fn observe_request(&self) -> ObserveRequest {
        ObserveRequest {
            thresholds: self.threshold.to_sorted(),
            root_margin: self.root_margin.clone(),
        }
    }
}

/// 进入动画：opacity 0→1，translateY 50→0
pub fn reveal_in(element: ElementId) -> Tween {
    Tween::single(
        element,
        defaults::REVEAL_IN_DURATION,
        EasingFunction::EaseOutCubic,
    )
    .track(AnimProperty::Opacity, 0.0, 1.0)
    .track(AnimProperty::TranslateY, defaults::REVEAL_OFFSET, 0.0)
}

/// 退出动画：opacity 1→0，translateY 0→50
pub fn reveal_out(element: ElementId) -> Tween {
    Tween::single(
        element,
        defaults::REVEAL_OUT_DURATION,
        EasingFunction::EaseInCubic,
    )
    .track(AnimProperty::Opacity, 1.0, 0.0)
    .track(AnimProperty::TranslateY, 0.0, defaults::REVEAL_OFFSET)
}

/// 滚动揭示动画
#[derive(Debug)]
pub struct RevealAnimator {
    options: RevealOptions,
    observed: Option<ObservedElement>,
    is_visible: Observable<bool>,
    torn_down: bool,
}

impl RevealAnimator {
    pub fn new(options: RevealOptions) -> FxResult<Self> {
        options.validate()?;
        Ok(Self {
            options,
            observed: None,
            is_visible: Observable::new(false),
            torn_down: false,
        })
    }

    /// 开始观察元素；元素不存在时什么也不做
    pub fn attach<H: IntersectionHost + ?Sized>(
        &mut self,
        element: Option<ElementId>,
        host: &mut H,
    ) -> bool {
        let Some(element) = element else {
            return false;
        };
        if self.torn_down || self.observed.is_some() {
            return false;
        }
        host.observe(element, &self.options.observe_request());
        self.observed = Some(ObservedElement::new(element, false));
        true
    }

    /// 处理相交回调：进入时播放进入动画，持续模式下离开时播放退出动画
    pub fn handle_entries<H, E>(&mut self, entries: &[IntersectionEntry], host: &mut H, surface: &mut E)
    where
        H: IntersectionHost + ?Sized,
        E: EffectSurface + ?Sized,
    {
        if self.torn_down {
            return;
        }
        let Some(observed) = self.observed.as_mut() else {
            return;
        };
        let element = observed.element;

        for entry in entries.iter().filter(|e| e.target == element) {
            match observed.apply(entry.is_intersecting, self.options.once) {
                Transition::Entered => {
                    self.is_visible.set(true);
                    surface.create_visual_effect(EffectSpec::Tween(reveal_in(element)));
                    if !observed.observing {
                        host.unobserve(element);
                    }
                    debug!(element = %element, "揭示进入");
                }
                Transition::Left => {
                    self.is_visible.set(false);
                    surface.create_visual_effect(EffectSpec::Tween(reveal_out(element)));
                    debug!(element = %element, "揭示退出");
                }
                Transition::Unchanged => {}
            }
        }
    }

    pub fn teardown<H: IntersectionHost + ?Sized>(&mut self, host: &mut H) {
        host.disconnect();
        self.torn_down = true;
    }

    pub fn is_visible(&self) -> &Observable<bool> {
        &self.is_visible
    }

    pub fn element(&self) -> Option<ElementId> {
        self.observed.map(|o| o.element)
    }
}

/// 逐字交错显示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStagger {
    /// 相邻字符的启动间隔
    pub delay: Millis,
}

impl Default for TextStagger {
    fn default() -> Self {
        Self {
            delay: defaults::TEXT_STAGGER,
        }
    }
}

impl TextStagger {
    pub fn new(delay: Millis) -> Self {
        Self { delay }
    }

    /// 把元素文本拆成单字节点并交错淡入
    ///
    /// 会替换元素原有的子节点，同一元素只应调用一次。返回新建的字符节点。
    pub fn animate_text<E: EffectSurface + ?Sized>(
        &self,
        element: Option<ElementId>,
        surface: &mut E,
    ) -> Vec<ElementId> {
        let Some(element) = element else {
            return Vec::new();
        };
        let text = surface.text_content(element).unwrap_or_default();
        let chars: Vec<String> = text
            .chars()
            .map(|c| {
                if c == ' ' {
                    '\u{00A0}'.to_string()
                } else {
                    c.to_string()
                }
            })
            .collect();

        let nodes = surface.replace_with_chars(element, &chars);
        for node in &nodes {
            surface.set_style(*node, StyleProperty::Display, "inline-block");
            surface.set_style(*node, StyleProperty::Opacity, "0");
        }

        if !nodes.is_empty() {
            let tween = Tween::new(
                nodes.clone(),
                defaults::TEXT_CHAR_DURATION,
                EasingFunction::EaseOutCubic,
            )
            .track(AnimProperty::Opacity, 0.0, 1.0)
            .track(AnimProperty::TranslateY, defaults::TEXT_CHAR_OFFSET, 0.0)
            .with_delay(Delay::Stagger(self.delay));
            surface.create_visual_effect(EffectSpec::Tween(tween));
        }

        debug!(element = %element, chars = nodes.len(), "逐字动画");
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingObserver, RecordingSurface};

    fn entry(intersecting: bool) -> IntersectionEntry {
        IntersectionEntry::new(ElementId(1), intersecting, if intersecting { 1.0 } else { 0.0 })
    }

    fn tween_of(spec: &EffectSpec) -> &Tween {
        match spec {
            EffectSpec::Tween(tween) => tween,
            other => panic!("expected tween, got {}", other.name()),
        }
    }

    #[test]
    fn test_reveal_once() {
        let mut host = RecordingObserver::default();
        let mut surface = RecordingSurface::default();
        let mut reveal = RevealAnimator::new(RevealOptions::default()).unwrap();
        assert!(reveal.attach(Some(ElementId(1)), &mut host));

        reveal.handle_entries(&[entry(false)], &mut host, &mut surface);
        assert!(surface.effects.is_empty());

        reveal.handle_entries(&[entry(true)], &mut host, &mut surface);
        assert!(reveal.is_visible().value());
        assert_eq!(host.unobserved, vec![ElementId(1)]);

        let tween = tween_of(&surface.effects[0].1);
        assert_eq!(tween.duration, 800);
        assert_eq!(tween.easing, EasingFunction::EaseOutCubic);

        reveal.handle_entries(&[entry(false)], &mut host, &mut surface);
        assert!(reveal.is_visible().value());
        assert_eq!(surface.effects.len(), 1);
    }

    #[test]
    fn test_reveal_continuous() {
        let mut host = RecordingObserver::default();
        let mut surface = RecordingSurface::default();
        let options = RevealOptions {
            once: false,
            ..Default::default()
        };
        let mut reveal = RevealAnimator::new(options).unwrap();
        reveal.attach(Some(ElementId(1)), &mut host);

        reveal.handle_entries(&[entry(true)], &mut host, &mut surface);
        reveal.handle_entries(&[entry(false)], &mut host, &mut surface);
        assert!(!reveal.is_visible().value());

        let out = tween_of(&surface.effects[1].1);
        assert_eq!(out.duration, 600);
        assert_eq!(out.easing, EasingFunction::EaseInCubic);
        assert!(host.unobserved.is_empty());
    }

    #[test]
    fn test_reveal_teardown() {
        let mut host = RecordingObserver::default();
        let mut surface = RecordingSurface::default();
        let mut reveal = RevealAnimator::new(RevealOptions::default()).unwrap();
        reveal.attach(Some(ElementId(1)), &mut host);
        reveal.teardown(&mut host);

        reveal.handle_entries(&[entry(true)], &mut host, &mut surface);
        assert!(surface.effects.is_empty());
        assert!(!reveal.is_visible().value());
    }

    #[test]
    fn test_animate_text_hi_there() {
        let mut surface = RecordingSurface::default();
        surface.texts.insert(ElementId(1), "Hi there".to_string());

        let nodes = TextStagger::default().animate_text(Some(ElementId(1)), &mut surface);
        assert_eq!(nodes.len(), 8);

        let (_, chars) = &surface.replaced[0];
        assert_eq!(chars[2], "\u{00A0}");
        assert_eq!(chars.concat(), "Hi\u{00A0}there");

        for node in &nodes {
            assert_eq!(surface.last_style(*node, StyleProperty::Opacity), Some("0"));
            assert_eq!(
                surface.last_style(*node, StyleProperty::Display),
                Some("inline-block")
            );
        }

        let tween = tween_of(&surface.effects[0].1);
        assert_eq!(tween.targets, nodes);
        assert_eq!(tween.duration, 600);
        let delays: Vec<Millis> = (0..nodes.len()).map(|i| tween.delay.for_index(i)).collect();
        assert_eq!(delays, vec![0, 50, 100, 150, 200, 250, 300, 350]);
    }

    #[test]
    fn test_animate_text_missing_element() {
        let mut surface = RecordingSurface::default();
        assert!(TextStagger::new(30).animate_text(None, &mut surface).is_empty());
        assert!(surface.replaced.is_empty());
    }
}
