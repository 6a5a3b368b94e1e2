//! # Weather CLI
//!
//! 气象站串口采集与查看工具。
//!
//! ## 采集
//!
//! ```bash
//! # 默认：/dev/ttyUSB0 @ 9600，快照写入 /tmp/weather/latest.json
//! weather-cli collect
//!
//! # 环境变量与命令行参数等价
//! WEATHER_PORT=/dev/ttyACM0 WEATHER_LOG_RAW=1 weather-cli collect --dialect amws
//!
//! # 回放录制的原始行
//! weather-cli collect --replay capture.log --output ./latest.json
//! ```
//!
//! ## 查看
//!
//! ```bash
//! weather-cli show
//! weather-cli watch --interval-secs 2
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{CollectCommand, ConfigTemplateCommand, PortsCommand, ShowCommand, WatchCommand};

/// Weather CLI - 气象站采集命令行工具
#[derive(Parser, Debug)]
#[command(name = "weather-cli")]
#[command(about = "Serial weather station collector and snapshot viewer", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 采集串口数据并发布最新快照（Ctrl+C 退出）
    Collect {
        #[command(flatten)]
        args: CollectCommand,
    },

    /// 打印最新快照
    Show {
        #[command(flatten)]
        args: ShowCommand,
    },

    /// 周期性刷新最新快照
    Watch {
        #[command(flatten)]
        args: WatchCommand,
    },

    /// 列出可用串口
    Ports(PortsCommand),

    /// 打印默认配置文件
    ConfigTemplate(ConfigTemplateCommand),
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_DIRECTIVES)),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Collect { args } => args.execute(),
        Commands::Show { args } => args.execute(),
        Commands::Watch { args } => args.execute(),
        Commands::Ports(cmd) => cmd.execute(),
        Commands::ConfigTemplate(cmd) => cmd.execute(),
    }
}

/// `RUST_LOG` 未设置时的默认日志级别
const DEFAULT_LOG_DIRECTIVES: &str = "weather_cli=info,weather_driver=info";
