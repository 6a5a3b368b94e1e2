//! 命令定义和实现

pub mod collect;
pub mod config;
pub mod ports;
pub mod show;
pub mod watch;

pub use collect::CollectCommand;
pub use config::ConfigTemplateCommand;
pub use ports::PortsCommand;
pub use show::ShowCommand;
pub use watch::WatchCommand;
