//! # Weather Protocol
//!
//! 气象传感器行协议定义（无 IO 依赖）
//!
//! ## 模块
//!
//! - `fields`: 厂商字段别名 → 规范字段（温度/湿度/气压）
//! - `grammar`: 两种行文法（紧凑 `KEY=VALUE,...` 与多行 `KEY:VALUE` 帧）及方言
//! - `reading`: 规范读数 `Reading` 的构造与快照序列化格式
//!
//! ## 数据流
//!
//! ```text
//! 原始行 / 帧缓冲
//!     ↓ grammar: parse_compact_line() / Dialect::parse_frame()
//! KeyValueMap
//!     ↓ fields: normalize_keys()
//! NormalizedFields
//!     ↓ reading: build_reading()
//! Reading
//! ```

pub mod fields;
pub mod grammar;
pub mod reading;

// 重新导出常用类型
pub use fields::*;
pub use grammar::*;
pub use reading::*;

use thiserror::Error;

/// 协议解析错误类型
///
/// 三种失败对调用方是同一个可区分的错误类型：摄取循环只需要知道"失败"，
/// 具体的种类仅用于诊断日志。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// 单元无法按文法解析出任何键值对
    #[error("Malformed unit: {0}")]
    MalformedUnit(String),

    /// 缺少规范字段
    #[error("Missing field: {field}")]
    MissingField { field: CanonicalField },

    /// 字段值不是有限浮点数
    #[error("Invalid value for field {field}: {value:?}")]
    ValueFormat { field: CanonicalField, value: String },
}
