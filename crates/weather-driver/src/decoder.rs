//! 格式分发解码
//!
//! 把组装器输出的单元按来源选择文法，转换为键值映射，再经过别名归一化和读数构造。

use crate::assembler::{AssemblerConfig, FrameAssembler, Unit};
use thiserror::Error;
use weather_protocol::{
    KeyValueMap, ProtocolError, Reading, build_reading, normalize_keys, parse_compact_line,
};

/// 解码失败（携带原始输入用于诊断）
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{source} (raw: {raw:?})")]
pub struct DecodeError {
    /// 原始输入：单行原文，或帧行加上终止行、以 ` | ` 连接（空帧只有终止行）
    pub raw: String,
    pub source: ProtocolError,
}

/// 失败种类（仅用于日志与统计，恢复策略不依赖它）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFailureKind {
    MalformedUnit,
    MissingField,
    ValueFormat,
}

impl DecodeError {
    pub fn kind(&self) -> DecodeFailureKind {
        match self.source {
            ProtocolError::MalformedUnit(_) => DecodeFailureKind::MalformedUnit,
            ProtocolError::MissingField { .. } => DecodeFailureKind::MissingField,
            ProtocolError::ValueFormat { .. } => DecodeFailureKind::ValueFormat,
        }
    }
}

/// 流式解码器
///
/// 持有帧组装器；摄取循环跨迭代持有同一个解码器实例。
#[derive(Debug)]
pub struct Decoder {
    assembler: FrameAssembler,
}

impl Decoder {
    pub fn new(config: AssemblerConfig) -> Self {
        Self {
            assembler: FrameAssembler::new(config),
        }
    }

    pub fn assembler(&self) -> &FrameAssembler {
        &self.assembler
    }

    /// 输入一行
    ///
    /// - `None`：该行被缓冲（帧未完成）或是空行
    /// - `Some(Ok(reading))`：单元解码成功
    /// - `Some(Err(e))`：单元已完成但解码失败；组装器状态只按自身规则变化
    pub fn feed(&mut self, line: &str) -> Option<Result<Reading, DecodeError>> {
        let unit = self.assembler.push(line.trim())?;
        Some(decode_unit(&unit))
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(AssemblerConfig::default())
    }
}

/// 解码一个完成的单元
pub fn decode_unit(unit: &Unit) -> Result<Reading, DecodeError> {
    let map = match unit {
        Unit::Line(line) => parse_compact_line(line),
        Unit::Frame { dialect, lines } => dialect.parse_frame(lines),
    };
    decode_map(&map).map_err(|source| DecodeError {
        raw: unit.raw(),
        source,
    })
}

fn decode_map(map: &KeyValueMap) -> Result<Reading, ProtocolError> {
    if map.is_empty() {
        return Err(ProtocolError::MalformedUnit("no key/value pairs".to_string()));
    }
    build_reading(&normalize_keys(map))
}
