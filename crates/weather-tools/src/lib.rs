//! # Weather Tools - 应用层共享组件
//!
//! **依赖原则**: 只依赖 `weather-protocol`，避免引入串口等硬件依赖
//!
//! ## 包含模块
//!
//! - `config` - 采集站静态配置（TOML）
//! - `snapshot` - 快照读取（保留最后一次有效读数）

pub mod config;
pub mod snapshot;

// 重新导出常用类型
pub use config::{DecoderSection, OutputSection, PipelineSection, SerialSection, StationConfig};
pub use snapshot::{SnapshotReader, SnapshotView, read_latest};
