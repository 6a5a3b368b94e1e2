//! 查看命令
//!
//! 打印最新快照。采集器尚未发布时提示等待。

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use weather_protocol::Reading;
use weather_tools::read_latest;

/// 采集器首次发布之前的提示
pub const WAITING_MESSAGE: &str = "Waiting for data from collector...";

/// 查看命令参数
#[derive(Args, Debug)]
pub struct ShowCommand {
    /// 快照文件路径
    #[arg(short, long, env = "WEATHER_OUT", default_value = "/tmp/weather/latest.json")]
    pub output: PathBuf,

    /// 输出原始 JSON
    #[arg(long)]
    pub json: bool,
}

impl ShowCommand {
    pub fn execute(&self) -> Result<()> {
        match read_latest(&self.output)? {
            Some(reading) if self.json => println!("{}", serde_json::to_string(&reading)?),
            Some(reading) => println!("{}", format_reading(&reading)),
            None => println!("{}", WAITING_MESSAGE),
        }
        Ok(())
    }
}

/// 人类可读格式（一位小数，与仪表板一致）
pub fn format_reading(reading: &Reading) -> String {
    format!(
        "Temperature: {:.1} °C | Humidity: {:.1} % | Pressure: {:.1} hPa | Last update (UTC): {}",
        reading.temperature_c,
        reading.humidity_pct,
        reading.pressure_hpa,
        reading.timestamp_string()
    )
}
