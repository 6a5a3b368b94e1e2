//! # 帧组装状态机
//!
//! 固件会在同一链路上（甚至同一会话中途）交替输出紧凑单行报文和多行帧。
//! 链路逐行交付、没有长度前缀，因此只能逐行判别，不能前瞻。
//!
//! ```text
//!            单行报文（仅 Idle 时）
//!          ┌──────────────┐
//!          │              ▼
//!        ┌─┴──┐  其他行  ┌──────────────┐
//!  ────▶ │Idle│ ───────▶ │ Accumulating │ ──┐ 其他行（追加，超限截尾）
//!        └────┘          └──────┬───────┘ ◀─┘
//!          ▲     终止行（输出帧） │
//!          └─────────────────────┘
//! ```
//!
//! 每行的判定优先级：
//! 1. 整行等于启用方言的终止行 → 输出缓冲中的帧并清空，回到 `Idle`（多行帧唯一的完成方式）
//! 2. 符合紧凑文法且处于 `Idle` → 直接输出单行单元，不触碰缓冲
//! 3. 其他 → 追加到缓冲，进入/保持 `Accumulating`

use crate::error::DriverError;
use tracing::warn;
use weather_protocol::{Dialect, DialectPolicy, is_compact_line};

/// 帧组装配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblerConfig {
    /// 缓冲行数上限（防御性上限，不是协议限制）
    pub max_frame_lines: usize,
    /// 超限后保留的最近行数
    pub retained_tail: usize,
    /// 方言选择策略
    pub dialect_policy: DialectPolicy,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_frame_lines: 300,
            retained_tail: 50,
            dialect_policy: DialectPolicy::Auto,
        }
    }
}

impl AssemblerConfig {
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.max_frame_lines == 0 {
            return Err(DriverError::InvalidConfig(
                "max_frame_lines must be greater than 0".to_string(),
            ));
        }
        if self.retained_tail > self.max_frame_lines {
            return Err(DriverError::InvalidConfig(format!(
                "retained_tail ({}) must not exceed max_frame_lines ({})",
                self.retained_tail, self.max_frame_lines
            )));
        }
        Ok(())
    }
}

/// 组装器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    /// 没有进行中的多行帧
    Idle,
    /// 缓冲非空
    Accumulating,
}

/// 组装完成的单元
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    /// 紧凑单行报文
    Line(String),
    /// 多行帧（不含终止行），文法由收到的终止行决定
    Frame { dialect: Dialect, lines: Vec<String> },
}

impl Unit {
    /// 原始输入（用于诊断日志）
    ///
    /// 帧的各行与收到的终止行以 ` | ` 连接，例如 `TA:1 | RH:2 | ~`。
    pub fn raw(&self) -> String {
        match self {
            Unit::Line(line) => line.clone(),
            Unit::Frame { dialect, lines } => {
                let mut raw = lines.join(" | ");
                if !raw.is_empty() {
                    raw.push_str(" | ");
                }
                raw.push_str(dialect.terminator());
                raw
            },
        }
    }
}

/// 帧组装器
///
/// 帧缓冲只属于组装器本身，`push()` 是唯一的修改入口。
#[derive(Debug)]
pub struct FrameAssembler {
    config: AssemblerConfig,
    buffer: Vec<String>,
    truncations: u64,
}

impl FrameAssembler {
    /// 创建组装器
    ///
    /// 不合法的上限会被收紧：`max_frame_lines` 至少为 1，`retained_tail` 不超过 `max_frame_lines`。
    /// 需要拒绝而不是收紧时，先调用 [`AssemblerConfig::validate`]。
    pub fn new(config: AssemblerConfig) -> Self {
        let max_frame_lines = config.max_frame_lines.max(1);
        let config = AssemblerConfig {
            max_frame_lines,
            retained_tail: config.retained_tail.min(max_frame_lines),
            ..config
        };
        Self {
            config,
            buffer: Vec::new(),
            truncations: 0,
        }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    pub fn state(&self) -> AssemblerState {
        if self.buffer.is_empty() {
            AssemblerState::Idle
        } else {
            AssemblerState::Accumulating
        }
    }

    /// 当前缓冲的行
    pub fn buffered(&self) -> &[String] {
        &self.buffer
    }

    /// 累计截尾次数
    pub fn truncation_count(&self) -> u64 {
        self.truncations
    }

    /// 输入一行，返回完成的单元（如果有）
    ///
    /// 空行被忽略，不改变状态。
    pub fn push(&mut self, line: &str) -> Option<Unit> {
        if line.is_empty() {
            return None;
        }

        // 1. 终止行：输出帧（可能为空帧，由解码阶段报告为畸形单元）
        if let Some(dialect) = self.config.dialect_policy.match_terminator(line) {
            let lines = std::mem::take(&mut self.buffer);
            return Some(Unit::Frame { dialect, lines });
        }

        // 2. 空闲状态下的紧凑单行报文
        if self.buffer.is_empty() && is_compact_line(line) {
            return Some(Unit::Line(line.to_string()));
        }

        // 3. 帧片段
        self.buffer.push(line.to_string());
        if self.buffer.len() > self.config.max_frame_lines {
            let excess = self.buffer.len().saturating_sub(self.config.retained_tail);
            self.buffer.drain(..excess);
            self.truncations += 1;
            warn!(
                "Frame buffer exceeded {} lines without terminator, keeping last {}",
                self.config.max_frame_lines, self.config.retained_tail
            );
        }
        None
    }
}
