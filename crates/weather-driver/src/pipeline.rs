//! Pipeline 摄取循环模块
//!
//! 负责从行源拉取数据、驱动解码器，并在解码成功时发布快照。
//!
//! 循环严格串行：读一行 → 解码 → （可选）发布 → 休眠 → 重复。
//! 任何解码失败或发布失败都只记录日志并继续，绝不终止循环。

use crate::decoder::{DecodeError, Decoder};
use crate::error::DriverError;
use crate::metrics::IngestMetrics;
use crate::publisher::{PublishError, Publisher};
use crate::source::{LineSource, SourceError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};
use weather_protocol::Reading;

/// 休眠切片：退出标志最迟在这个间隔内被察觉
const PACE_SLICE: Duration = Duration::from_millis(100);

/// Pipeline 配置
///
/// # Example
///
/// ```
/// use weather_driver::PipelineConfig;
///
/// // 默认：每处理一行后休眠 1000ms，不打印原始行
/// let config = PipelineConfig::default();
///
/// let config = PipelineConfig {
///     poll_delay_ms: 200,
///     log_raw: true,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// 每处理一行非空数据后的休眠时间（毫秒）
    ///
    /// 用于限制发布频率和 CPU/IO 压力，不影响正确性。
    pub poll_delay_ms: u64,
    /// 是否以 info 级别记录每一条原始行
    pub log_raw: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_delay_ms: 1000,
            log_raw: false,
        }
    }
}

impl PipelineConfig {
    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }
}

/// 循环正常退出的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// 运行标志被清除
    Stopped,
    /// 行源结束（回放文件读完）
    EndOfStream,
}

/// 单行处理结果
#[derive(Debug)]
pub enum LineOutcome {
    /// 行被缓冲，帧尚未完成
    Buffered,
    /// 解码并发布成功
    Published(Reading),
    /// 单元解码失败
    DecodeFailed(DecodeError),
    /// 解码成功但发布失败（读数被丢弃，旧快照仍然有效）
    PublishFailed(PublishError),
}

/// 处理一行：解码，成功则发布
///
/// 只有解码成功时才调用发布器。
pub fn process_line(
    line: &str,
    decoder: &mut Decoder,
    publisher: &mut impl Publisher,
    metrics: &IngestMetrics,
) -> LineOutcome {
    let outcome = match decoder.feed(line) {
        None => LineOutcome::Buffered,
        Some(Err(e)) => {
            metrics.units_completed.fetch_add(1, Ordering::Relaxed);
            metrics.decode_failures.fetch_add(1, Ordering::Relaxed);
            LineOutcome::DecodeFailed(e)
        },
        Some(Ok(reading)) => {
            metrics.units_completed.fetch_add(1, Ordering::Relaxed);
            metrics.readings_decoded.fetch_add(1, Ordering::Relaxed);
            match publisher.publish(&reading) {
                Ok(()) => {
                    metrics.publishes.fetch_add(1, Ordering::Relaxed);
                    LineOutcome::Published(reading)
                },
                Err(e) => {
                    metrics.publish_failures.fetch_add(1, Ordering::Relaxed);
                    LineOutcome::PublishFailed(e)
                },
            }
        },
    };
    metrics
        .frame_truncations
        .store(decoder.assembler().truncation_count(), Ordering::Relaxed);
    outcome
}

/// 摄取循环主体
///
/// # 参数
/// - `source`: 行源（读取自带有界超时）
/// - `decoder`: 解码器（跨迭代持有帧缓冲）
/// - `publisher`: 快照发布器
/// - `config`: Pipeline 配置
/// - `is_running`: 运行标志（协作式退出）
/// - `metrics`: 指标
///
/// # 返回值
/// - `Ok(LoopExit)`：运行标志被清除或行源正常结束
/// - `Err(DriverError::Source)`：行源出现致命错误（设备断开等）
pub fn ingest_loop(
    source: &mut impl LineSource,
    decoder: &mut Decoder,
    publisher: &mut impl Publisher,
    config: &PipelineConfig,
    is_running: Arc<AtomicBool>,
    metrics: Arc<IngestMetrics>,
) -> Result<LoopExit, DriverError> {
    let poll_delay = config.poll_delay();

    loop {
        // Acquire: 看到 false 时，也能看到设置方在此之前的全部写入
        if !is_running.load(Ordering::Acquire) {
            trace!("Ingest loop: is_running flag is false, exiting");
            return Ok(LoopExit::Stopped);
        }

        // ============================================================
        // 1. 读取一行（带超时，避免无限阻塞）
        // ============================================================
        let line = match source.read_line() {
            Ok(Some(line)) => line,
            Ok(None) => {
                // 超时是正常情况
                metrics.empty_polls.fetch_add(1, Ordering::Relaxed);
                continue;
            },
            Err(SourceError::EndOfStream) => {
                info!("Line source reached end of stream");
                return Ok(LoopExit::EndOfStream);
            },
            Err(e) => {
                metrics.source_errors.fetch_add(1, Ordering::Relaxed);
                if e.is_fatal() {
                    error!("Ingest loop: fatal line source error: {}", e);
                    return Err(DriverError::Source(e));
                }
                error!("Ingest loop: line source error: {}", e);
                // 非致命错误：退避后继续尝试恢复
                pace(poll_delay, &is_running);
                continue;
            },
        };

        if line.is_empty() {
            metrics.empty_polls.fetch_add(1, Ordering::Relaxed);
            continue;
        }
        metrics.lines_total.fetch_add(1, Ordering::Relaxed);

        if config.log_raw {
            info!("[raw] {}", line);
        }

        // ============================================================
        // 2. 解码并发布
        // ============================================================
        match process_line(&line, decoder, publisher, &metrics) {
            LineOutcome::Buffered => {
                trace!("Buffered frame line ({} pending)", decoder.assembler().buffered().len());
            },
            LineOutcome::Published(reading) => {
                debug!(
                    "[ok] ts={} temperature_c={} humidity_pct={} pressure_hpa={}",
                    reading.timestamp_string(),
                    reading.temperature_c,
                    reading.humidity_pct,
                    reading.pressure_hpa
                );
            },
            LineOutcome::DecodeFailed(e) => {
                warn!("[skip] {}", e);
            },
            LineOutcome::PublishFailed(e) => {
                warn!("[skip] publish failed, previous snapshot kept: {}", e);
            },
        }

        // ============================================================
        // 3. 节流
        // ============================================================
        pace(poll_delay, &is_running);
    }
}

/// 分片休眠，运行标志被清除时提前返回
fn pace(delay: Duration, is_running: &AtomicBool) {
    let mut remaining = delay;
    while !remaining.is_zero() && is_running.load(Ordering::Acquire) {
        let slice = remaining.min(PACE_SLICE);
        spin_sleep::sleep(slice);
        remaining -= slice;
    }
}
