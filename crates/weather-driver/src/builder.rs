//! Builder 模式实现
//!
//! 提供链式构造 `Collector` 实例的便捷方式。

use crate::assembler::AssemblerConfig;
use crate::collector::Collector;
use crate::decoder::Decoder;
use crate::error::DriverError;
use crate::pipeline::PipelineConfig;
use crate::publisher::AtomicFilePublisher;
use crate::source::{LineSource, SerialConfig, open_replay, open_serial};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// 默认快照路径
pub const DEFAULT_OUTPUT_PATH: &str = "/tmp/weather/latest.json";

/// 由 Builder 构造的采集器类型
pub type BoxedCollector = Collector<Box<dyn LineSource + Send>, AtomicFilePublisher>;

/// Collector Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use weather_driver::{CollectorBuilder, PipelineConfig};
///
/// // 使用默认配置（/dev/ttyUSB0 @ 9600）
/// let collector = CollectorBuilder::new().build().unwrap();
///
/// // 回放录制的原始行，不节流
/// let collector = CollectorBuilder::new()
///     .replay("capture.log")
///     .output("./latest.json")
///     .pipeline_config(PipelineConfig {
///         poll_delay_ms: 0,
///         log_raw: true,
///     })
///     .build()
///     .unwrap();
/// ```
pub struct CollectorBuilder {
    /// 串口配置
    serial: SerialConfig,
    /// 回放文件（如果设置，忽略串口配置）
    replay: Option<PathBuf>,
    /// 快照路径
    output: Option<PathBuf>,
    /// 帧组装配置
    assembler_config: AssemblerConfig,
    /// Pipeline 配置
    pipeline_config: PipelineConfig,
}

impl CollectorBuilder {
    pub fn new() -> Self {
        Self {
            serial: SerialConfig::default(),
            replay: None,
            output: None,
            assembler_config: AssemblerConfig::default(),
            pipeline_config: PipelineConfig::default(),
        }
    }

    /// 整体替换串口配置
    pub fn serial_config(mut self, config: SerialConfig) -> Self {
        self.serial = config;
        self
    }

    /// 设置串口设备（可选，默认 `/dev/ttyUSB0`）
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.serial.port = port.into();
        self
    }

    /// 设置波特率（可选，默认 9600）
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.serial.baud_rate = baud_rate;
        self
    }

    /// 设置单次读超时（可选，默认 2s）
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.serial.read_timeout = timeout;
        self
    }

    /// 从文件回放原始行，代替串口
    pub fn replay(mut self, path: impl Into<PathBuf>) -> Self {
        self.replay = Some(path.into());
        self
    }

    /// 设置快照路径（可选，默认 `/tmp/weather/latest.json`）
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn assembler_config(mut self, config: AssemblerConfig) -> Self {
        self.assembler_config = config;
        self
    }

    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_config = config;
        self
    }

    fn validate(&self) -> Result<(), DriverError> {
        self.assembler_config.validate()?;
        if self.replay.is_none() {
            if self.serial.port.trim().is_empty() {
                return Err(DriverError::InvalidConfig("serial port must not be empty".to_string()));
            }
            if self.serial.baud_rate == 0 {
                return Err(DriverError::InvalidConfig(
                    "baud rate must be greater than 0".to_string(),
                ));
            }
            if self.serial.read_timeout.is_zero() {
                return Err(DriverError::InvalidConfig(
                    "read timeout must be greater than 0".to_string(),
                ));
            }
        }
        if self.output.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            return Err(DriverError::InvalidConfig("output path must not be empty".to_string()));
        }
        Ok(())
    }

    /// 构建采集器
    ///
    /// 打开行源（串口或回放文件），但不启动摄取循环。
    ///
    /// # Errors
    /// - `DriverError::InvalidConfig`: 配置不合法
    /// - `DriverError::Source`: 串口或回放文件打开失败
    pub fn build(self) -> Result<BoxedCollector, DriverError> {
        self.validate()?;

        let source: Box<dyn LineSource + Send> = match &self.replay {
            Some(path) => {
                info!("Replaying raw lines from {}", path.display());
                Box::new(open_replay(path)?)
            },
            None => {
                info!(
                    "Opening serial port {} @ {} baud",
                    self.serial.port, self.serial.baud_rate
                );
                Box::new(open_serial(&self.serial)?)
            },
        };

        let output = self.output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH));
        info!("Publishing snapshots to {}", output.display());

        Ok(Collector::new(
            source,
            Decoder::new(self.assembler_config),
            AtomicFilePublisher::new(output),
            self.pipeline_config,
        ))
    }
}

impl Default for CollectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
