//! # 字段别名归一化
//!
//! 不同固件对同一物理量使用不同缩写（如 `T` / `TEMP` / `TA`），
//! 本模块把它们映射到三个规范字段。别名表是纯数据，新增厂商方言只需追加条目。

use std::fmt;

/// 规范字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    /// 温度（°C）
    Temperature,
    /// 相对湿度（%）
    Humidity,
    /// 气压（hPa）
    Pressure,
}

impl CanonicalField {
    /// 全部规范字段（按构造读数时的检查顺序）
    pub const ALL: [CanonicalField; 3] = [
        CanonicalField::Temperature,
        CanonicalField::Humidity,
        CanonicalField::Pressure,
    ];

    /// 规范字段名
    pub fn name(self) -> &'static str {
        match self {
            CanonicalField::Temperature => "temperature",
            CanonicalField::Humidity => "humidity",
            CanonicalField::Pressure => "pressure",
        }
    }

    /// 按别名查找规范字段（忽略大小写和首尾空白）
    pub fn from_alias(key: &str) -> Option<Self> {
        let key = key.trim();
        ALIAS_TABLE
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(key))
            .map(|(_, field)| *field)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 厂商别名表
///
/// | 规范字段 | 别名 |
/// |---------|------|
/// | temperature | t, temp, temperature, ta（AMWS 环境温度） |
/// | humidity | h, hum, humidity, rh（AMWS 相对湿度） |
/// | pressure | p, pres, pressure, ba（AMWS 大气压） |
pub const ALIAS_TABLE: &[(&str, CanonicalField)] = &[
    ("t", CanonicalField::Temperature),
    ("temp", CanonicalField::Temperature),
    ("temperature", CanonicalField::Temperature),
    ("ta", CanonicalField::Temperature),
    ("h", CanonicalField::Humidity),
    ("hum", CanonicalField::Humidity),
    ("humidity", CanonicalField::Humidity),
    ("rh", CanonicalField::Humidity),
    ("p", CanonicalField::Pressure),
    ("pres", CanonicalField::Pressure),
    ("pressure", CanonicalField::Pressure),
    ("ba", CanonicalField::Pressure),
];

/// 协议键 → 文本值 的有序映射
///
/// 插入已存在的键会原地覆盖旧值（后到者生效），保持首次出现的位置。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValueMap {
    entries: Vec<(String, String)>,
}

impl KeyValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入键值对（同键覆盖）
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for KeyValueMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = KeyValueMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// 归一化后的字段（每个规范字段至多一个文本值）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedFields {
    temperature: Option<String>,
    humidity: Option<String>,
    pressure: Option<String>,
}

impl NormalizedFields {
    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: CanonicalField, value: impl Into<String>) {
        *self.slot_mut(field) = Some(value.into());
    }

    pub fn is_empty(&self) -> bool {
        CanonicalField::ALL.iter().all(|f| self.get(*f).is_none())
    }

    /// 缺失的规范字段
    pub fn missing(&self) -> Vec<CanonicalField> {
        CanonicalField::ALL.into_iter().filter(|f| self.get(*f).is_none()).collect()
    }

    fn slot(&self, field: CanonicalField) -> &Option<String> {
        match field {
            CanonicalField::Temperature => &self.temperature,
            CanonicalField::Humidity => &self.humidity,
            CanonicalField::Pressure => &self.pressure,
        }
    }

    fn slot_mut(&mut self, field: CanonicalField) -> &mut Option<String> {
        match field {
            CanonicalField::Temperature => &mut self.temperature,
            CanonicalField::Humidity => &mut self.humidity,
            CanonicalField::Pressure => &mut self.pressure,
        }
    }
}

/// 把厂商键映射为规范字段
///
/// 未知键（校验和、电池电量等）被静默丢弃，不会导致解码失败。
/// 值只做首尾空白裁剪，不做数值解析。
pub fn normalize_keys(map: &KeyValueMap) -> NormalizedFields {
    let mut normalized = NormalizedFields::default();
    for (key, value) in map.iter() {
        if let Some(field) = CanonicalField::from_alias(key) {
            normalized.set(field, value.trim());
        }
    }
    normalized
}
