//! 采集命令
//!
//! 从串口（或回放文件）读取原始行，解码后原子发布最新快照，直到 Ctrl+C 或回放结束。

use super::config::load_station_config;
use anyhow::{Context, Result, bail};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};
use weather_driver::{AssemblerConfig, CollectorBuilder, LoopExit, PipelineConfig, SerialConfig};
use weather_protocol::DialectPolicy;
use weather_tools::StationConfig;

/// 采集命令参数
///
/// 每个参数都覆盖配置文件中的同名项。
#[derive(Args, Debug, Default)]
pub struct CollectCommand {
    /// 配置文件（TOML）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 串口设备
    #[arg(short, long, env = "WEATHER_PORT")]
    pub port: Option<String>,

    /// 波特率
    #[arg(short, long, env = "WEATHER_BAUD")]
    pub baud: Option<u32>,

    /// 每处理一行后的休眠（秒，可为小数）
    #[arg(long, env = "WEATHER_POLL_SLEEP")]
    pub poll_sleep: Option<f64>,

    /// 每处理一行后的休眠（毫秒，优先于 `--poll-sleep`）
    #[arg(long)]
    pub poll_delay_ms: Option<u64>,

    /// 快照文件路径
    #[arg(short, long, env = "WEATHER_OUT")]
    pub output: Option<PathBuf>,

    /// 以 info 级别记录每条原始行（环境变量接受 1/0、true/false、yes/no、on/off）
    #[arg(long, env = "WEATHER_LOG_RAW", value_parser = clap::builder::FalseyValueParser::new())]
    pub log_raw: bool,

    /// 帧方言：auto | amws | mws
    #[arg(long, env = "WEATHER_DIALECT")]
    pub dialect: Option<DialectPolicy>,

    /// 从文件回放原始行（代替串口）
    #[arg(long)]
    pub replay: Option<PathBuf>,
}

impl CollectCommand {
    pub fn execute(&self) -> Result<()> {
        let mut config = load_station_config(self.config.as_deref())?;
        self.apply_overrides(&mut config)?;
        config.validate().context("Invalid configuration")?;

        let is_running = Arc::new(AtomicBool::new(true));
        let flag = is_running.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nReceived interrupt signal. Shutting down...");
            flag.store(false, Ordering::Release);
        })
        .context("Failed to set signal handler")?;

        let mut collector = builder_from_config(&config, self.replay.clone())
            .build()
            .context("Failed to start collector")?;

        info!("Collector running. Press Ctrl+C to stop.");
        let exit = collector.run(is_running)?;
        match exit {
            LoopExit::Stopped => info!("Stopped by user"),
            LoopExit::EndOfStream => info!("Replay finished"),
        }

        let metrics = collector.metrics();
        if metrics.publishes == 0 {
            warn!("No reading was published to {}", config.output.path.display());
        }
        println!("{}", metrics);
        Ok(())
    }

    /// 命令行参数 / 环境变量覆盖配置文件
    fn apply_overrides(&self, config: &mut StationConfig) -> Result<()> {
        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(secs) = self.poll_sleep {
            if !secs.is_finite() || secs < 0.0 {
                bail!("poll sleep must be a non-negative number of seconds, got {}", secs);
            }
            config.pipeline.poll_delay_ms = (secs * 1000.0).round() as u64;
        }
        if let Some(ms) = self.poll_delay_ms {
            config.pipeline.poll_delay_ms = ms;
        }
        if let Some(output) = &self.output {
            config.output.path = output.clone();
        }
        if self.log_raw {
            config.pipeline.log_raw = true;
        }
        if let Some(dialect) = self.dialect {
            config.decoder.dialect = dialect;
        }
        Ok(())
    }
}

/// 配置 → 驱动层 Builder
fn builder_from_config(config: &StationConfig, replay: Option<PathBuf>) -> CollectorBuilder {
    let builder = CollectorBuilder::new()
        .serial_config(SerialConfig {
            port: config.serial.port.clone(),
            baud_rate: config.serial.baud_rate,
            read_timeout: Duration::from_millis(config.serial.read_timeout_ms),
        })
        .output(config.output.path.clone())
        .assembler_config(AssemblerConfig {
            max_frame_lines: config.decoder.max_frame_lines,
            retained_tail: config.decoder.retained_tail,
            dialect_policy: config.decoder.dialect,
        })
        .pipeline_config(PipelineConfig {
            poll_delay_ms: config.pipeline.poll_delay_ms,
            log_raw: config.pipeline.log_raw,
        });
    match replay {
        Some(path) => builder.replay(path),
        None => builder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = StationConfig::default();
        let cmd = CollectCommand {
            port: Some("/dev/ttyACM0".to_string()),
            baud: Some(19_200),
            poll_sleep: Some(0.25),
            output: Some(PathBuf::from("/srv/weather/latest.json")),
            log_raw: true,
            dialect: Some(DialectPolicy::Mws),
            ..Default::default()
        };
        cmd.apply_overrides(&mut config).unwrap();

        assert_eq!(config.serial.port, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 19_200);
        assert_eq!(config.pipeline.poll_delay_ms, 250);
        assert_eq!(config.output.path, PathBuf::from("/srv/weather/latest.json"));
        assert!(config.pipeline.log_raw);
        assert_eq!(config.decoder.dialect, DialectPolicy::Mws);
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let mut config = StationConfig::default();
        config.pipeline.log_raw = true;
        CollectCommand::default().apply_overrides(&mut config).unwrap();

        let mut expected = StationConfig::default();
        expected.pipeline.log_raw = true;
        assert_eq!(config, expected);
    }

    #[derive(clap::Parser, Debug)]
    struct CollectArgs {
        #[command(flatten)]
        collect: CollectCommand,
    }

    #[test]
    fn test_log_raw_from_numeric_env() {
        use clap::Parser;

        // 本 crate 中只有这个测试读写 WEATHER_LOG_RAW
        unsafe { std::env::set_var("WEATHER_LOG_RAW", "1") };
        let enabled = CollectArgs::try_parse_from(["weather-cli"]);
        unsafe { std::env::set_var("WEATHER_LOG_RAW", "0") };
        let disabled = CollectArgs::try_parse_from(["weather-cli"]);
        unsafe { std::env::remove_var("WEATHER_LOG_RAW") };
        let unset = CollectArgs::try_parse_from(["weather-cli"]);
        let flag = CollectArgs::try_parse_from(["weather-cli", "--log-raw"]);

        assert!(enabled.unwrap().collect.log_raw);
        assert!(!disabled.unwrap().collect.log_raw);
        assert!(!unset.unwrap().collect.log_raw);
        assert!(flag.unwrap().collect.log_raw);
    }

    #[test]
    fn test_negative_poll_sleep_rejected() {
        let cmd = CollectCommand {
            poll_sleep: Some(-1.0),
            ..Default::default()
        };
        assert!(cmd.apply_overrides(&mut StationConfig::default()).is_err());
    }

    #[test]
    fn test_replay_through_builder() {
        let dir = tempfile::tempdir().unwrap();
        let replay = dir.path().join("capture.log");
        std::fs::write(&replay, "TA:22.4\nRH:50\nBA:1001.90\n~\n").unwrap();

        let mut config = StationConfig::default();
        config.output.path = dir.path().join("latest.json");
        config.pipeline.poll_delay_ms = 0;

        let mut collector = builder_from_config(&config, Some(replay)).build().unwrap();
        let exit = collector.run(Arc::new(AtomicBool::new(true))).unwrap();

        assert_eq!(exit, LoopExit::EndOfStream);
        let latest = weather_tools::read_latest(&config.output.path).unwrap().unwrap();
        assert_eq!(latest.pressure_hpa, 1001.90);
    }
}
