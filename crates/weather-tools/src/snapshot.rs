//! # 快照读取
//!
//! 读者只依赖发布器的原子替换保证，不加锁。文件在首次发布之前不存在；
//! 偶发的读取/解析失败时，`SnapshotReader` 继续展示最后一次有效的读数。

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use weather_protocol::Reading;

/// 读取最新快照
///
/// - `Ok(None)`：文件尚不存在（采集器还没有发布过）
/// - `Err(..)`：文件存在但无法读取或解析
pub fn read_latest<P: AsRef<Path>>(path: P) -> Result<Option<Reading>> {
    let path = path.as_ref();
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read snapshot {}", path.display()));
        },
    };
    let reading = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
    Ok(Some(reading))
}

/// 一次轮询的结果
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotView {
    /// 还没有任何有效读数
    Waiting,
    /// 本次成功读到的读数
    Fresh(Reading),
    /// 本次读取失败或文件缺失，沿用上一次有效读数
    Stale(Reading),
}

impl SnapshotView {
    pub fn reading(&self) -> Option<&Reading> {
        match self {
            SnapshotView::Waiting => None,
            SnapshotView::Fresh(r) | SnapshotView::Stale(r) => Some(r),
        }
    }
}

/// 带"最后有效值"语义的快照读者
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    path: PathBuf,
    last_good: Option<Reading>,
}

impl SnapshotReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_good: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_good(&self) -> Option<&Reading> {
        self.last_good.as_ref()
    }

    /// 读取一次快照
    ///
    /// 读取失败不会返回错误，而是降级为 `Stale` / `Waiting`。
    pub fn poll(&mut self) -> SnapshotView {
        match read_latest(&self.path) {
            Ok(Some(reading)) => {
                self.last_good = Some(reading.clone());
                SnapshotView::Fresh(reading)
            },
            Ok(None) | Err(_) => match &self.last_good {
                Some(reading) => SnapshotView::Stale(reading.clone()),
                None => SnapshotView::Waiting,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"{"ts":"2026-03-01T12:00:00.123456Z","temperature_c":23.4,"humidity_pct":56.1,"pressure_hpa":1012.8}"#;

    #[test]
    fn test_read_latest_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_latest(dir.path().join("latest.json")).unwrap().is_none());
    }

    #[test]
    fn test_read_latest_valid_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.json");
        fs::write(&path, RECORD).unwrap();

        let reading = read_latest(&path).unwrap().unwrap();
        assert_eq!(reading.temperature_c, 23.4);
        assert_eq!(reading.timestamp_string(), "2026-03-01T12:00:00.123456000Z");
    }

    #[test]
    fn test_read_latest_corrupt_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.json");
        fs::write(&path, "{\"ts\":").unwrap();
        assert!(read_latest(&path).is_err());
    }

    #[test]
    fn test_reader_keeps_last_good() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.json");
        let mut reader = SnapshotReader::new(&path);

        assert_eq!(reader.poll(), SnapshotView::Waiting);

        fs::write(&path, RECORD).unwrap();
        let fresh = reader.poll();
        assert!(matches!(fresh, SnapshotView::Fresh(_)));

        fs::write(&path, "garbage").unwrap();
        match reader.poll() {
            SnapshotView::Stale(reading) => assert_eq!(reading.pressure_hpa, 1012.8),
            other => panic!("Expected Stale, got {:?}", other),
        }

        fs::remove_file(&path).unwrap();
        assert!(matches!(reader.poll(), SnapshotView::Stale(_)));
        assert_eq!(reader.last_good().map(|r| r.humidity_pct), Some(56.1));
    }

    #[test]
    fn test_view_reading() {
        assert!(SnapshotView::Waiting.reading().is_none());
    }
}
