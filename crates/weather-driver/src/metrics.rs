//! 摄取链路指标
//!
//! 原子计数器，可以在任何线程读取，不引入锁竞争。只计数，不聚合读数本身。

use std::sync::atomic::{AtomicU64, Ordering};

/// 摄取循环实时指标
///
/// # 使用示例
///
/// ```rust
/// use weather_driver::IngestMetrics;
/// use std::sync::Arc;
/// use std::sync::atomic::Ordering;
///
/// let metrics = Arc::new(IngestMetrics::default());
/// metrics.lines_total.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.lines_total, 1);
/// ```
#[derive(Debug, Default)]
pub struct IngestMetrics {
    /// 收到的非空行数
    pub lines_total: AtomicU64,

    /// 读超时或空行次数（正常现象）
    pub empty_polls: AtomicU64,

    /// 完成的单元数（单行报文 + 多行帧）
    pub units_completed: AtomicU64,

    /// 解码成功的读数
    pub readings_decoded: AtomicU64,

    /// 解码失败次数
    pub decode_failures: AtomicU64,

    /// 成功发布次数
    pub publishes: AtomicU64,

    /// 发布失败次数
    pub publish_failures: AtomicU64,

    /// 帧缓冲截尾次数（终止行长期缺失）
    pub frame_truncations: AtomicU64,

    /// 行源错误次数
    pub source_errors: AtomicU64,
}

impl IngestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lines_total: self.lines_total.load(Ordering::Relaxed),
            empty_polls: self.empty_polls.load(Ordering::Relaxed),
            units_completed: self.units_completed.load(Ordering::Relaxed),
            readings_decoded: self.readings_decoded.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            publishes: self.publishes.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            frame_truncations: self.frame_truncations.load(Ordering::Relaxed),
            source_errors: self.source_errors.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.lines_total.store(0, Ordering::Relaxed);
        self.empty_polls.store(0, Ordering::Relaxed);
        self.units_completed.store(0, Ordering::Relaxed);
        self.readings_decoded.store(0, Ordering::Relaxed);
        self.decode_failures.store(0, Ordering::Relaxed);
        self.publishes.store(0, Ordering::Relaxed);
        self.publish_failures.store(0, Ordering::Relaxed);
        self.frame_truncations.store(0, Ordering::Relaxed);
        self.source_errors.store(0, Ordering::Relaxed);
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub lines_total: u64,
    pub empty_polls: u64,
    pub units_completed: u64,
    pub readings_decoded: u64,
    pub decode_failures: u64,
    pub publishes: u64,
    pub publish_failures: u64,
    pub frame_truncations: u64,
    pub source_errors: u64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "lines={} units={} decoded={} decode_failures={} published={} publish_failures={} truncations={} source_errors={}",
            self.lines_total,
            self.units_completed,
            self.readings_decoded,
            self.decode_failures,
            self.publishes,
            self.publish_failures,
            self.frame_truncations,
            self.source_errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_reset() {
        let metrics = IngestMetrics::new();
        metrics.lines_total.fetch_add(3, Ordering::Relaxed);
        metrics.publish_failures.fetch_add(1, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.lines_total, 3);
        assert_eq!(snapshot.publish_failures, 1);
        assert_eq!(snapshot.publishes, 0);

        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_snapshot_display() {
        let snapshot = MetricsSnapshot {
            lines_total: 5,
            readings_decoded: 2,
            ..Default::default()
        };
        let text = snapshot.to_string();
        assert!(text.contains("lines=5"));
        assert!(text.contains("decoded=2"));
    }
}
