//! 配置文件定位与模板
//!
//! 未显式指定 `--config` 时，使用用户配置目录下的 `weather/station.toml`（存在时）。

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use weather_tools::StationConfig;

/// 默认配置文件路径
///
/// - Linux: `~/.config/weather/station.toml`
/// - macOS: `~/Library/Application Support/weather/station.toml`
/// - Windows: `%APPDATA%\weather\station.toml`
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("weather").join("station.toml"))
}

/// 加载配置：显式路径必须存在；默认路径不存在时使用内置默认值
pub fn load_station_config(explicit: Option<&Path>) -> Result<StationConfig> {
    match explicit {
        Some(path) => StationConfig::load_from_file(path),
        None => match default_config_file().filter(|path| path.exists()) {
            Some(path) => {
                tracing::info!("Using config file {}", path.display());
                StationConfig::load_from_file(&path)
            },
            None => Ok(StationConfig::default()),
        },
    }
}

/// 打印（或写出）默认配置
#[derive(Args, Debug)]
pub struct ConfigTemplateCommand {
    /// 写入文件而不是打印到标准输出
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ConfigTemplateCommand {
    pub fn execute(&self) -> Result<()> {
        let config = StationConfig::default();
        match &self.output {
            Some(path) => {
                config
                    .save_to_file(path)
                    .with_context(|| format!("Failed to write template to {}", path.display()))?;
                println!("✅ 配置模板已写入: {}", path.display());
            },
            None => print!("{}", config.to_toml()?),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_file_name() {
        if let Some(path) = default_config_file() {
            assert!(path.ends_with("weather/station.toml"));
        }
    }

    #[test]
    fn test_load_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("station.toml");
        std::fs::write(&path, "[serial]\nbaud_rate = 4800\n").unwrap();

        let config = load_station_config(Some(&path)).unwrap();
        assert_eq!(config.serial.baud_rate, 4800);
    }

    #[test]
    fn test_load_missing_explicit_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_station_config(Some(&dir.path().join("none.toml"))).is_err());
    }

    #[test]
    fn test_template_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("station.toml");
        ConfigTemplateCommand {
            output: Some(path.clone()),
        }
        .execute()
        .unwrap();

        let loaded = StationConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, StationConfig::default());
    }
}
