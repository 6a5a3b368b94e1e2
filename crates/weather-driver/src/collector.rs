//! 采集器：把行源、解码器和发布器组合为一个可运行的单元

use crate::decoder::Decoder;
use crate::error::DriverError;
use crate::metrics::{IngestMetrics, MetricsSnapshot};
use crate::pipeline::{LoopExit, PipelineConfig, ingest_loop};
use crate::publisher::Publisher;
use crate::source::LineSource;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::info;

/// 气象站采集器
///
/// 通常通过 [`CollectorBuilder`](crate::CollectorBuilder) 创建。
/// 也可以直接组合自定义的行源与发布器（测试中常用）。
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::sync::atomic::AtomicBool;
/// use weather_driver::CollectorBuilder;
///
/// let mut collector = CollectorBuilder::new()
///     .port("/dev/ttyUSB0")
///     .output("/tmp/weather/latest.json")
///     .build()
///     .unwrap();
///
/// let running = Arc::new(AtomicBool::new(true));
/// let exit = collector.run(running).unwrap();
/// println!("{:?}: {}", exit, collector.metrics());
/// ```
pub struct Collector<S, P> {
    source: S,
    decoder: Decoder,
    publisher: P,
    config: PipelineConfig,
    metrics: Arc<IngestMetrics>,
}

impl<S: LineSource, P: Publisher> Collector<S, P> {
    pub fn new(source: S, decoder: Decoder, publisher: P, config: PipelineConfig) -> Self {
        Self {
            source,
            decoder,
            publisher,
            config,
            metrics: Arc::new(IngestMetrics::new()),
        }
    }

    /// 运行摄取循环直到运行标志被清除、行源结束或出现致命错误
    ///
    /// 解码器状态跨多次 `run()` 保留。
    pub fn run(&mut self, is_running: Arc<AtomicBool>) -> Result<LoopExit, DriverError> {
        info!(
            "Collector started (poll delay {}ms, dialect {})",
            self.config.poll_delay_ms,
            self.decoder.assembler().config().dialect_policy
        );
        let result = ingest_loop(
            &mut self.source,
            &mut self.decoder,
            &mut self.publisher,
            &self.config,
            is_running,
            self.metrics.clone(),
        );
        info!("Collector stopped: {}", self.metrics.snapshot());
        result
    }

    /// 当前指标
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 共享指标句柄（可在其他线程读取）
    pub fn metrics_handle(&self) -> Arc<IngestMetrics> {
        self.metrics.clone()
    }

    pub fn pipeline_config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::AtomicFilePublisher;
    use crate::source::ReaderLineSource;
    use std::io::Cursor;
    use std::sync::atomic::Ordering;
    use weather_protocol::Reading;

    #[test]
    fn test_collector_runs_replay_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.json");
        let input = "T=1,H=2,P=3\r\nTA:22.4\nRH:50\nBA:1001.90\n~\n";

        let mut collector = Collector::new(
            ReaderLineSource::new(Cursor::new(input.as_bytes().to_vec())),
            Decoder::default(),
            AtomicFilePublisher::new(&path),
            PipelineConfig {
                poll_delay_ms: 0,
                log_raw: false,
            },
        );

        let exit = collector.run(Arc::new(AtomicBool::new(true))).unwrap();
        assert_eq!(exit, LoopExit::EndOfStream);
        assert_eq!(collector.metrics().publishes, 2);
        assert_eq!(collector.publisher().path(), path.as_path());

        let latest: Reading =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(latest.temperature_c, 22.4);
    }

    #[test]
    fn test_metrics_handle_is_shared() {
        let collector = Collector::new(
            ReaderLineSource::new(Cursor::new(Vec::new())),
            Decoder::default(),
            AtomicFilePublisher::new("unused.json"),
            PipelineConfig::default(),
        );
        collector.metrics_handle().lines_total.fetch_add(4, Ordering::Relaxed);
        assert_eq!(collector.metrics().lines_total, 4);
    }
}
