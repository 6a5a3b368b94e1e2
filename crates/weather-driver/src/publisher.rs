//! 原子快照发布
//!
//! 读者与写者之间不加锁，唯一的同步原语是同目录下的 rename：
//!
//! ```text
//! 1. 序列化 Reading → JSON
//! 2. 写入同目录临时文件 .latest.json.XXXXXX.tmp，flush + fsync
//! 3. rename 到 latest.json（原子替换）
//! ```
//!
//! 并发读者只会看到旧的完整记录或新的完整记录。发布失败时临时文件被删除，
//! 目标文件保持上一次成功发布的内容。

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::trace;
use weather_protocol::Reading;

/// 快照文件权限（仍受 umask 限制）
#[cfg(unix)]
const SNAPSHOT_MODE: u32 = 0o644;

/// 快照发布错误
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("Failed to serialize reading: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write temporary snapshot in {}: {source}", .dir.display())]
    Write { dir: PathBuf, source: io::Error },

    #[error("Failed to replace {}: {source}", .path.display())]
    Persist { path: PathBuf, source: io::Error },
}

/// 快照发布抽象
pub trait Publisher {
    fn publish(&mut self, reading: &Reading) -> Result<(), PublishError>;
}

impl<P: Publisher + ?Sized> Publisher for &mut P {
    fn publish(&mut self, reading: &Reading) -> Result<(), PublishError> {
        (**self).publish(reading)
    }
}

/// 基于临时文件 + rename 的原子发布器
#[derive(Debug, Clone)]
pub struct AtomicFilePublisher {
    path: PathBuf,
}

impl AtomicFilePublisher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 快照目标路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 第一阶段：把完整记录写入同目录的临时文件（目标文件尚未改变）
    pub fn stage(&self, reading: &Reading) -> Result<StagedSnapshot, PublishError> {
        let dir = self.target_dir();
        fs::create_dir_all(&dir).map_err(|source| PublishError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let body = serde_json::to_vec(reading)?;

        let write_err = |source| PublishError::Write {
            dir: dir.clone(),
            source,
        };
        let prefix = format!(".{}.", self.file_name());
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(".tmp");
        // 临时文件默认 0600，rename 后沿用该权限
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(SNAPSHOT_MODE));
        }
        let mut file = builder.tempfile_in(&dir).map_err(write_err)?;
        file.write_all(&body).map_err(write_err)?;
        file.flush().map_err(write_err)?;
        file.as_file().sync_all().map_err(write_err)?;

        trace!("Staged snapshot at {}", file.path().display());
        Ok(StagedSnapshot {
            file,
            target: self.path.clone(),
        })
    }

    fn target_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string())
    }
}

impl Publisher for AtomicFilePublisher {
    fn publish(&mut self, reading: &Reading) -> Result<(), PublishError> {
        self.stage(reading)?.commit()
    }
}

/// 已写入临时文件、尚未替换目标的快照
///
/// 丢弃而不提交时临时文件会被删除。
#[derive(Debug)]
pub struct StagedSnapshot {
    file: NamedTempFile,
    target: PathBuf,
}

impl StagedSnapshot {
    /// 临时文件路径
    pub fn temp_path(&self) -> &Path {
        self.file.path()
    }

    /// 第二阶段：rename 到目标路径（唯一要求原子的操作）
    pub fn commit(self) -> Result<(), PublishError> {
        let target = self.target;
        self.file.persist(&target).map_err(|e| PublishError::Persist {
            path: target.clone(),
            source: e.error,
        })?;
        sync_parent_dir(&target);
        Ok(())
    }
}

/// 持久化目录项（尽力而为，失败不影响发布结果）
#[cfg(unix)]
fn sync_parent_dir(target: &Path) {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty())
        && let Ok(dir) = fs::File::open(parent)
    {
        let _ = dir.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_target: &Path) {}
