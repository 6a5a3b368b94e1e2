//! 驱动层错误类型定义

use crate::decoder::DecodeError;
use crate::publisher::PublishError;
use crate::source::SourceError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 行源错误
    #[error("Line source error: {0}")]
    Source(#[from] SourceError),

    /// 快照发布错误
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// 解码错误
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// 配置无效
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
