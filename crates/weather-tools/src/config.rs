//! # 采集站配置
//!
//! 启动时构建一次，之后只读。优先级：默认值 ← TOML 文件 ← 命令行参数 / 环境变量。
//! 最后一层由应用负责，本模块不读取环境变量。
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 9600
//! read_timeout_ms = 2000
//!
//! [pipeline]
//! poll_delay_ms = 1000
//! log_raw = false
//!
//! [output]
//! path = "/tmp/weather/latest.json"
//!
//! [decoder]
//! dialect = "auto"
//! max_frame_lines = 300
//! retained_tail = 50
//! ```

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use weather_protocol::DialectPolicy;

/// 采集站配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub serial: SerialSection,
    pub pipeline: PipelineSection,
    pub output: OutputSection,
    pub decoder: DecoderSection,
}

/// `[serial]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSection {
    /// 串口设备名
    pub port: String,
    /// 波特率
    pub baud_rate: u32,
    /// 单次读超时（ms）
    pub read_timeout_ms: u64,
}

impl Default for SerialSection {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            read_timeout_ms: 2000,
        }
    }
}

/// `[pipeline]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// 每处理一行后的休眠（ms）
    pub poll_delay_ms: u64,
    /// 是否记录原始行
    pub log_raw: bool,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            poll_delay_ms: 1000,
            log_raw: false,
        }
    }
}

/// `[output]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// 快照文件路径
    pub path: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/tmp/weather/latest.json"),
        }
    }
}

/// `[decoder]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderSection {
    pub dialect: DialectPolicy,
    /// 帧缓冲行数上限
    pub max_frame_lines: usize,
    /// 截尾后保留的行数
    pub retained_tail: usize,
}

impl Default for DecoderSection {
    fn default() -> Self {
        Self {
            dialect: DialectPolicy::Auto,
            max_frame_lines: 300,
            retained_tail: 50,
        }
    }
}

impl StationConfig {
    /// 从 TOML 文件加载配置（缺失的字段取默认值）
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: StationConfig = toml::from_str(content).context("Failed to parse TOML")?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write config file {}", path.display()))
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.trim().is_empty() {
            bail!("serial.port must not be empty");
        }
        if self.serial.baud_rate == 0 {
            bail!("serial.baud_rate must be greater than 0");
        }
        if self.serial.read_timeout_ms == 0 {
            bail!("serial.read_timeout_ms must be greater than 0");
        }
        if self.output.path.as_os_str().is_empty() {
            bail!("output.path must not be empty");
        }
        if self.decoder.max_frame_lines == 0 {
            bail!("decoder.max_frame_lines must be greater than 0");
        }
        if self.decoder.retained_tail > self.decoder.max_frame_lines {
            bail!(
                "decoder.retained_tail ({}) must not exceed decoder.max_frame_lines ({})",
                self.decoder.retained_tail,
                self.decoder.max_frame_lines
            );
        }
        Ok(())
    }
}
