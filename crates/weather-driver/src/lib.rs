//! 驱动层模块
//!
//! 本模块提供气象站串口链路的采集功能，包括：
//! - 行源抽象（串口 / 回放文件 / 任意 `Read`）
//! - 帧组装状态机（单行报文与多行帧的逐行判别、有界缓冲）
//! - 格式分发解码（两种行文法 → 规范读数）
//! - 原子快照发布（临时文件 + rename）
//! - 摄取循环（失败即丢弃并继续、协作式退出）
//!
//! # 数据流
//!
//! ```text
//! LineSource → FrameAssembler → Decoder → Publisher → latest.json ← 读者
//! ```

mod builder;
pub mod assembler;
pub mod collector;
pub mod decoder;
mod error;
pub mod metrics;
pub mod pipeline;
pub mod publisher;
pub mod source;

pub use assembler::{AssemblerConfig, AssemblerState, FrameAssembler, Unit};
pub use builder::{BoxedCollector, CollectorBuilder, DEFAULT_OUTPUT_PATH};
pub use collector::Collector;
pub use decoder::{DecodeError, DecodeFailureKind, Decoder, decode_unit};
pub use error::DriverError;
pub use metrics::{IngestMetrics, MetricsSnapshot};
pub use pipeline::{LineOutcome, LoopExit, PipelineConfig, ingest_loop, process_line};
pub use publisher::{AtomicFilePublisher, PublishError, Publisher, StagedSnapshot};
pub use source::{
    LineSource, PortSummary, ReaderLineSource, SerialConfig, SerialLineSource, SourceError,
    available_ports, open_replay, open_serial,
};
