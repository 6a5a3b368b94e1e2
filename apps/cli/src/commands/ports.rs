//! 串口列表命令

use anyhow::Result;
use clap::Args;
use weather_driver::available_ports;

/// 列出可用串口
#[derive(Args, Debug)]
pub struct PortsCommand {}

impl PortsCommand {
    pub fn execute(&self) -> Result<()> {
        let ports = available_ports()?;
        if ports.is_empty() {
            println!("No serial ports found");
            return Ok(());
        }
        for port in ports {
            println!("{:<24} {}", port.name, port.kind);
        }
        Ok(())
    }
}
