//! # EasterEgg 模块
//!
//! 点击计数彩蛋与 Konami 按键序列。
//!
//! ## 点击状态机
//!
//! ```text
//! idle(n) ──click(间隔 ≤ 2000ms)──► idle(n+1)
//! idle(n) ──click(间隔 > 2000ms)──► idle(1)
//!
//! n == 3  → 抖动
//! n == 5  → 旋转 + 色相闪烁
//! n >= 7  → active：彩纸 + 旋转 + 通知，3000ms 后 active=false、n=0
//! ```
//!
//! 所有视觉效果都是"提交即忘"，彼此之间没有共享状态，
//! 重复进入激活分支时每次都会产生一组独立的效果和一个独立的复位定时器。

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::effect::{self, ConfettiBurst, EffectSpec, HueFlash, Notification, defaults};
use crate::error::{FxError, FxResult};
use crate::observable::Observable;
use crate::platform::{EffectSurface, ElementId, Millis, Scheduler, TimerId};

/// Konami 序列
pub const KONAMI_CODE: [&str; 10] = [
    "ArrowUp",
    "ArrowUp",
    "ArrowDown",
    "ArrowDown",
    "ArrowLeft",
    "ArrowRight",
    "ArrowLeft",
    "ArrowRight",
    "b",
    "a",
];

/// 彩蛋配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EasterEggConfig {
    /// 超过该间隔的点击重新从 1 计数
    #[serde(default = "default_reset_gap_ms")]
    pub reset_gap_ms: Millis,

    /// 抖动触发次数
    #[serde(default = "default_shake_at")]
    pub shake_at: u32,

    /// 旋转 + 闪烁触发次数
    #[serde(default = "default_spin_at")]
    pub spin_at: u32,

    /// 激活触发次数（达到及以上）
    #[serde(default = "default_activate_at")]
    pub activate_at: u32,

    /// 激活状态持续时间
    #[serde(default = "default_active_ms")]
    pub active_ms: Millis,

    /// 每次爆发的彩纸数量
    #[serde(default = "default_confetti_count")]
    pub confetti_count: usize,

    /// 彩纸调色板
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,

    /// 彩纸容器兜底移除时间
    #[serde(default = "default_confetti_container_ttl_ms")]
    pub confetti_container_ttl_ms: Millis,

    /// 通知文本
    #[serde(default = "default_message")]
    pub message: String,
}

impl Default for EasterEggConfig {
    fn default() -> Self {
        Self {
            reset_gap_ms: default_reset_gap_ms(),
            shake_at: default_shake_at(),
            spin_at: default_spin_at(),
            activate_at: default_activate_at(),
            active_ms: default_active_ms(),
            confetti_count: default_confetti_count(),
            palette: default_palette(),
            confetti_container_ttl_ms: default_confetti_container_ttl_ms(),
            message: default_message(),
        }
    }
}

// 默认值函数
fn default_reset_gap_ms() -> Millis {
    2000
}

fn default_shake_at() -> u32 {
    3
}

fn default_spin_at() -> u32 {
    5
}

fn default_activate_at() -> u32 {
    7
}

fn default_active_ms() -> Millis {
    3000
}

fn default_confetti_count() -> usize {
    50
}

fn default_palette() -> Vec<String> {
    ["#0ea5e9", "#d946ef", "#06b6d4", "#8b5cf6", "#ec4899"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn default_confetti_container_ttl_ms() -> Millis {
    defaults::CONFETTI_CONTAINER_TTL
}

fn default_message() -> String {
    "🎉 You found the easter egg! 🎉".to_string()
}

impl EasterEggConfig {
    /// 校验阈值顺序与调色板
    pub fn validate(&self) -> FxResult<()> {
        if self.shake_at == 0 {
            return Err(FxError::invalid_option("shake_at", "必须大于 0"));
        }
        if self.spin_at <= self.shake_at {
            return Err(FxError::invalid_option(
                "spin_at",
                format!("必须大于 shake_at ({})", self.shake_at),
            ));
        }
        if self.activate_at <= self.spin_at {
            return Err(FxError::invalid_option(
                "activate_at",
                format!("必须大于 spin_at ({})", self.spin_at),
            ));
        }
        if self.palette.is_empty() {
            return Err(FxError::invalid_option("palette", "调色板不能为空"));
        }
        Ok(())
    }
}

/// 一次点击的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickOutcome {
    /// 没有目标或已卸载
    Ignored,
    /// 仅计数
    Counted,
    /// 抖动
    Shake,
    /// 旋转 + 色相闪烁
    SpinFlash,
    /// 激活
    Activated,
}

/// Konami 序列匹配器（滑动窗口）
#[derive(Debug, Clone)]
pub struct KonamiMatcher {
    sequence: Vec<String>,
    buffer: VecDeque<String>,
}

impl Default for KonamiMatcher {
    fn default() -> Self {
        Self::new(KONAMI_CODE.iter().map(|k| k.to_string()).collect())
    }
}

impl KonamiMatcher {
    pub fn new(sequence: Vec<String>) -> Self {
        Self {
            buffer: VecDeque::with_capacity(sequence.len() + 1),
            sequence,
        }
    }

    /// 追加按键，匹配成功时清空缓冲并返回 `true`
    pub fn push(&mut self, key: &str) -> bool {
        self.buffer.push_back(key.to_string());
        while self.buffer.len() > self.sequence.len() {
            self.buffer.pop_front();
        }
        if !self.sequence.is_empty() && self.buffer.iter().eq(self.sequence.iter()) {
            self.buffer.clear();
            return true;
        }
        false
    }

    /// 最近的按键（按时间顺序）
    pub fn progress(&self) -> Vec<&str> {
        self.buffer.iter().map(String::as_str).collect()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// 彩蛋触发器
#[derive(Debug)]
pub struct EasterEggTrigger<R: Rng = StdRng> {
    config: EasterEggConfig,
    click_count: u32,
    last_click: Option<Millis>,
    active: Observable<bool>,
    konami: KonamiMatcher,
    /// 尚未触发的复位定时器
    pending_resets: Vec<TimerId>,
    rng: R,
    torn_down: bool,
}

impl EasterEggTrigger<StdRng> {
    /// 使用固定种子创建
    pub fn new(config: EasterEggConfig, seed: u64) -> FxResult<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> EasterEggTrigger<R> {
    pub fn with_rng(config: EasterEggConfig, rng: R) -> FxResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            click_count: 0,
            last_click: None,
            active: Observable::new(false),
            konami: KonamiMatcher::default(),
            pending_resets: Vec::new(),
            rng,
            torn_down: false,
        })
    }

    /// 处理一次点击
    pub fn trigger<S, E>(
        &mut self,
        target: Option<ElementId>,
        scheduler: &mut S,
        surface: &mut E,
    ) -> ClickOutcome
    where
        S: Scheduler + ?Sized,
        E: EffectSurface + ?Sized,
    {
        if self.torn_down {
            return ClickOutcome::Ignored;
        }
        let Some(target) = target else {
            return ClickOutcome::Ignored;
        };

        let now = scheduler.now();
        self.click_count = match self.last_click {
            Some(last) if now.saturating_sub(last) <= self.config.reset_gap_ms => {
                self.click_count + 1
            }
            _ => 1,
        };
        self.last_click = Some(now);
        let count = self.click_count;

        if count == self.config.shake_at {
            debug!(count, element = %target, "彩蛋：抖动");
            surface.create_visual_effect(EffectSpec::Tween(effect::shake(target)));
            ClickOutcome::Shake
        } else if count == self.config.spin_at {
            debug!(count, element = %target, "彩蛋：旋转闪烁");
            surface.create_visual_effect(EffectSpec::Tween(effect::spin(target)));
            surface.create_visual_effect(EffectSpec::HueFlash(HueFlash::new(target)));
            ClickOutcome::SpinFlash
        } else if count >= self.config.activate_at {
            self.active.set(true);
            let burst = self.confetti();
            surface.create_visual_effect(EffectSpec::Confetti(burst));
            surface.create_visual_effect(EffectSpec::Tween(effect::spin(target)));
            surface.create_visual_effect(EffectSpec::Notification(Notification::new(
                self.config.message.clone(),
            )));

            let timer = scheduler.set_timeout(self.config.active_ms);
            self.pending_resets.push(timer);
            info!(count, timer = %timer, "彩蛋激活");
            ClickOutcome::Activated
        } else {
            ClickOutcome::Counted
        }
    }

    /// 处理一次按键
    pub fn handle_key<E: EffectSurface + ?Sized>(&mut self, key: &str, surface: &mut E) -> bool {
        if self.torn_down || !self.konami.push(key) {
            return false;
        }

        let first = self.confetti();
        let second = self.confetti();
        surface.create_visual_effect(EffectSpec::Confetti(first));
        surface.create_visual_effect(EffectSpec::Confetti(second));
        surface.create_visual_effect(EffectSpec::Notification(Notification::new(
            self.config.message.clone(),
        )));
        info!("Konami 序列匹配");
        true
    }

    /// 定时器回调：只处理自己的复位定时器
    ///
    /// 每个复位定时器到期都会无条件复位，即使之后又有新的激活。
    pub fn handle_timer(&mut self, timer: TimerId) -> bool {
        if self.torn_down {
            return false;
        }
        let Some(index) = self.pending_resets.iter().position(|t| *t == timer) else {
            return false;
        };
        self.pending_resets.remove(index);
        self.active.set(false);
        self.click_count = 0;
        debug!(timer = %timer, "彩蛋复位");
        true
    }

    /// 卸载：清除所有待执行的定时器，之后的点击、按键、定时器全部无效
    pub fn teardown<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        for timer in self.pending_resets.drain(..) {
            scheduler.clear_timeout(timer);
        }
        self.torn_down = true;
    }

    fn confetti(&mut self) -> ConfettiBurst {
        ConfettiBurst::generate(
            self.config.confetti_count,
            &self.config.palette,
            self.config.confetti_container_ttl_ms,
            &mut self.rng,
        )
    }

    pub fn click_count(&self) -> u32 {
        self.click_count
    }

    pub fn last_click(&self) -> Option<Millis> {
        self.last_click
    }

    pub fn active(&self) -> &Observable<bool> {
        &self.active
    }

    pub fn konami_progress(&self) -> Vec<&str> {
        self.konami.progress()
    }

    pub fn pending_resets(&self) -> &[TimerId] {
        &self.pending_resets
    }

    pub fn config(&self) -> &EasterEggConfig {
        &self.config
    }
}
