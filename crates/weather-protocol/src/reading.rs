//! # 规范读数
//!
//! `Reading` 既是解码结果，也是发布快照的记录格式：
//!
//! ```json
//! {"ts":"2026-01-01T00:00:00.000000000Z","temperature_c":23.4,"humidity_pct":56.1,"pressure_hpa":1012.8}
//! ```

use crate::ProtocolError;
use crate::fields::{CanonicalField, NormalizedFields};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// 规范读数
///
/// 三个字段必须同时存在才能构造；构造后不可变，只会被下一次成功解码的读数取代。
///
/// 时间戳以纳秒精度写出，ISO-8601 文本形式与内存值可以无损往返。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// 解码时刻（UTC）
    #[serde(rename = "ts", with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    /// 温度（°C）
    pub temperature_c: f64,
    /// 相对湿度（%）
    pub humidity_pct: f64,
    /// 气压（hPa）
    pub pressure_hpa: f64,
}

impl Reading {
    /// 快照中 `ts` 字段的文本形式
    pub fn timestamp_string(&self) -> String {
        format_timestamp(&self.timestamp)
    }

    /// 按规范字段取值
    pub fn value(&self, field: CanonicalField) -> f64 {
        match field {
            CanonicalField::Temperature => self.temperature_c,
            CanonicalField::Humidity => self.humidity_pct,
            CanonicalField::Pressure => self.pressure_hpa,
        }
    }
}

/// 构造读数，时间戳取当前时刻
pub fn build_reading(fields: &NormalizedFields) -> Result<Reading, ProtocolError> {
    build_reading_at(fields, Utc::now())
}

/// 构造读数，使用显式给定的时刻
///
/// # 错误
///
/// - `MissingField`：任一规范字段缺失（按 温度 → 湿度 → 气压 顺序检查）
/// - `ValueFormat`：字段文本不能解析为有限浮点数（`NaN` / `inf` 也会被拒绝）
pub fn build_reading_at(
    fields: &NormalizedFields,
    at: DateTime<Utc>,
) -> Result<Reading, ProtocolError> {
    let temperature_c = parse_field(fields, CanonicalField::Temperature)?;
    let humidity_pct = parse_field(fields, CanonicalField::Humidity)?;
    let pressure_hpa = parse_field(fields, CanonicalField::Pressure)?;

    Ok(Reading {
        timestamp: at,
        temperature_c,
        humidity_pct,
        pressure_hpa,
    })
}

fn parse_field(fields: &NormalizedFields, field: CanonicalField) -> Result<f64, ProtocolError> {
    let raw = fields.get(field).ok_or(ProtocolError::MissingField { field })?;
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ProtocolError::ValueFormat {
            field,
            value: raw.to_string(),
        }),
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// `ts` 字段的序列化格式：RFC 3339，纳秒精度，`Z` 后缀
mod iso8601 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
