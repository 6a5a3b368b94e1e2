//! # 行文法与方言
//!
//! 同一条链路上可能交替出现两类报文：
//!
//! - **紧凑单行**：`T=23.4,H=56.1,P=1012.8`
//! - **多行帧**：每行一个 `KEY:VALUE`，由方言特定的终止行结束
//!
//! | 方言 | 终止行 | 说明 |
//! |------|--------|------|
//! | `Amws` | `~` | 键如 `TA` / `RH` / `BA` |
//! | `Mws` | `SND` | 每行可带 `MWS` 前缀标签 |

use crate::fields::KeyValueMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// AMWS 帧终止行
pub const AMWS_TERMINATOR: &str = "~";
/// MWS 帧终止行
pub const MWS_TERMINATOR: &str = "SND";
/// MWS 行前缀标签
pub const MWS_TAG: &str = "MWS";

/// 多行帧方言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// `~` 结尾的 AMWS 帧
    Amws,
    /// `SND` 结尾、`MWS` 标签前缀的帧
    Mws,
}

impl Dialect {
    pub const ALL: [Dialect; 2] = [Dialect::Amws, Dialect::Mws];

    /// 帧终止行（整行精确匹配）
    pub fn terminator(self) -> &'static str {
        match self {
            Dialect::Amws => AMWS_TERMINATOR,
            Dialect::Mws => MWS_TERMINATOR,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dialect::Amws => "amws",
            Dialect::Mws => "mws",
        }
    }

    /// 按本方言的多行文法解析帧缓冲
    ///
    /// - 每行按第一个 `:` 切分为键/值，没有 `:` 的行被忽略
    /// - 键裁剪空白后转为大写
    /// - 值裁剪空白，并截断到下一个 `:` 之前（去掉 `22.4:C` 这类单位注记）
    pub fn parse_frame<S: AsRef<str>>(self, lines: &[S]) -> KeyValueMap {
        let mut map = KeyValueMap::new();
        for line in lines {
            let line = self.strip_tag(line.as_ref().trim());
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            let value = value.split_once(':').map_or(value, |(head, _)| head).trim();
            map.insert(key.trim().to_ascii_uppercase(), value);
        }
        map
    }

    /// 去掉行首的方言标签（仅 MWS）
    fn strip_tag(self, line: &str) -> &str {
        match self {
            Dialect::Amws => line,
            Dialect::Mws => {
                let Some(head) = line.get(..MWS_TAG.len()) else {
                    return line;
                };
                let rest = &line[MWS_TAG.len()..];
                if head.eq_ignore_ascii_case(MWS_TAG) && rest.starts_with(is_tag_separator) {
                    rest.trim_start_matches(is_tag_separator)
                } else {
                    line
                }
            },
        }
    }
}

fn is_tag_separator(c: char) -> bool {
    c.is_whitespace() || c == ',' || c == ';'
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 方言选择策略
///
/// 采用静态配置：`Auto` 同时识别所有方言的终止行，帧的文法由实际收到的终止行决定；
/// 固定方言时只识别该方言的终止行，其他方言的终止行会被当作普通行缓冲。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectPolicy {
    #[default]
    Auto,
    Amws,
    Mws,
}

impl DialectPolicy {
    /// 当前策略下启用的方言
    pub fn dialects(self) -> &'static [Dialect] {
        match self {
            DialectPolicy::Auto => &Dialect::ALL,
            DialectPolicy::Amws => &[Dialect::Amws],
            DialectPolicy::Mws => &[Dialect::Mws],
        }
    }

    /// 若该行是某个启用方言的终止行，返回对应方言
    pub fn match_terminator(self, line: &str) -> Option<Dialect> {
        self.dialects().iter().copied().find(|d| d.terminator() == line)
    }
}

impl FromStr for DialectPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(DialectPolicy::Auto),
            "amws" => Ok(DialectPolicy::Amws),
            "mws" => Ok(DialectPolicy::Mws),
            other => Err(format!("unknown dialect '{}' (expected auto, amws or mws)", other)),
        }
    }
}

impl fmt::Display for DialectPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DialectPolicy::Auto => "auto",
            DialectPolicy::Amws => "amws",
            DialectPolicy::Mws => "mws",
        })
    }
}

/// 是否符合紧凑单行文法（`,` 分隔的片段中至少有一个 `key=value`）
pub fn is_compact_line(line: &str) -> bool {
    line.split(',').any(|fragment| fragment.contains('='))
}

/// 解析紧凑单行
///
/// 按 `,` 切分，只保留含 `=` 的片段，按第一个 `=` 切分并裁剪空白。
pub fn parse_compact_line(line: &str) -> KeyValueMap {
    line.split(',')
        .filter_map(|fragment| fragment.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_compact_line() {
        assert!(is_compact_line("T=23.4,H=56.1,P=1012.8"));
        assert!(is_compact_line("BATT=87"));
        assert!(is_compact_line("garbage,X=1"));
        assert!(!is_compact_line("TA:22.4"));
        assert!(!is_compact_line("~"));
        assert!(!is_compact_line(""));
    }

    #[test]
    fn test_parse_compact_line() {
        let map = parse_compact_line(" T = 23.4 , H=56.1,noise, P=1012.8=x ");
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("T"), Some("23.4"));
        assert_eq!(map.get("H"), Some("56.1"));
        // 只按第一个 '=' 切分
        assert_eq!(map.get("P"), Some("1012.8=x"));
    }

    #[test]
    fn test_parse_amws_frame() {
        let lines = ["AMWS", "TA:22.4", " RH : 50 ", "BA:1001.90", "~"];
        let map = Dialect::Amws.parse_frame(&lines);

        assert_eq!(map.len(), 3);
        assert_eq!(map.get("TA"), Some("22.4"));
        assert_eq!(map.get("RH"), Some("50"));
        assert_eq!(map.get("BA"), Some("1001.90"));
    }

    #[test]
    fn test_parse_frame_uppercases_keys_and_cuts_unit_suffix() {
        let lines = ["ta:22.4:C", "rh:50"];
        let map = Dialect::Amws.parse_frame(&lines);
        assert_eq!(map.get("TA"), Some("22.4"));
        assert_eq!(map.get("RH"), Some("50"));
        assert_eq!(map.get("ta"), None);
    }

    #[test]
    fn test_parse_mws_frame_strips_tag() {
        let lines = ["MWS", "MWS TA:18.0", "MWS,RH:61", "mws; BA:998.5", "MWSX:1"];
        let map = Dialect::Mws.parse_frame(&lines);

        assert_eq!(map.get("TA"), Some("18.0"));
        assert_eq!(map.get("RH"), Some("61"));
        assert_eq!(map.get("BA"), Some("998.5"));
        // 标签后没有分隔符时不剥离
        assert_eq!(map.get("MWSX"), Some("1"));
    }

    #[test]
    fn test_amws_does_not_strip_mws_tag() {
        let map = Dialect::Amws.parse_frame(&["MWS TA:18.0"]);
        assert_eq!(map.get("MWS TA"), Some("18.0"));
    }

    #[test]
    fn test_dialect_terminators() {
        assert_eq!(Dialect::Amws.terminator(), "~");
        assert_eq!(Dialect::Mws.terminator(), "SND");
    }

    #[test]
    fn test_policy_match_terminator() {
        assert_eq!(DialectPolicy::Auto.match_terminator("~"), Some(Dialect::Amws));
        assert_eq!(DialectPolicy::Auto.match_terminator("SND"), Some(Dialect::Mws));
        assert_eq!(DialectPolicy::Amws.match_terminator("SND"), None);
        assert_eq!(DialectPolicy::Mws.match_terminator("~"), None);
        assert_eq!(DialectPolicy::Auto.match_terminator("snd"), None);
        assert_eq!(DialectPolicy::Auto.match_terminator("~~"), None);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("auto".parse::<DialectPolicy>(), Ok(DialectPolicy::Auto));
        assert_eq!(" AMWS ".parse::<DialectPolicy>(), Ok(DialectPolicy::Amws));
        assert_eq!("mws".parse::<DialectPolicy>(), Ok(DialectPolicy::Mws));
        assert!("nmea".parse::<DialectPolicy>().is_err());
        assert_eq!(DialectPolicy::Mws.to_string(), "mws");
    }
}
