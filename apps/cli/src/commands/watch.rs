//! 监视命令
//!
//! 周期性读取快照；读取失败时继续显示最后一次有效读数。

use super::show::{WAITING_MESSAGE, format_reading};
use anyhow::{Context, Result, bail};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use weather_tools::{SnapshotReader, SnapshotView};

/// 监视命令参数
#[derive(Args, Debug)]
pub struct WatchCommand {
    /// 快照文件路径
    #[arg(short, long, env = "WEATHER_OUT", default_value = "/tmp/weather/latest.json")]
    pub output: PathBuf,

    /// 刷新间隔（秒）
    #[arg(short, long, env = "WEATHER_UI_REFRESH", default_value_t = 2)]
    pub interval_secs: u64,
}

impl WatchCommand {
    pub fn execute(&self) -> Result<()> {
        if self.interval_secs == 0 {
            bail!("interval must be at least 1 second");
        }

        let is_running = Arc::new(AtomicBool::new(true));
        let flag = is_running.clone();
        ctrlc::set_handler(move || flag.store(false, Ordering::Release))
            .context("Failed to set signal handler")?;

        let mut reader = SnapshotReader::new(&self.output);
        let interval = Duration::from_secs(self.interval_secs);
        println!("Watching {} (every {}s, Ctrl+C to stop)", self.output.display(), self.interval_secs);

        while is_running.load(Ordering::Acquire) {
            println!("{}", render(&reader.poll()));
            sleep_while_running(interval, &is_running);
        }
        Ok(())
    }
}

fn render(view: &SnapshotView) -> String {
    match view {
        SnapshotView::Waiting => WAITING_MESSAGE.to_string(),
        SnapshotView::Fresh(reading) => format_reading(reading),
        SnapshotView::Stale(reading) => format!("{} (stale)", format_reading(reading)),
    }
}

fn sleep_while_running(total: Duration, is_running: &AtomicBool) {
    let step = Duration::from_millis(100);
    let mut remaining = total;
    while !remaining.is_zero() && is_running.load(Ordering::Acquire) {
        let slice = remaining.min(step);
        std::thread::sleep(slice);
        remaining -= slice;
    }
}
