//! # 行源适配层
//!
//! 链路只按行交付数据，没有长度前缀。本模块把字节流切分为去掉行尾的文本行，
//! 并统一超时/断开语义：
//!
//! | 情况 | `read_line()` 返回 |
//! |------|-------------------|
//! | 完整一行 | `Ok(Some(line))` |
//! | 读超时（无完整行） | `Ok(None)` |
//! | 流结束（回放文件读完） | `Err(SourceError::EndOfStream)` |
//! | 设备/IO 错误 | `Err(SourceError::Device / Io)` |
//!
//! 超时到达时已收到的半行字节保留在缓冲中，下一次读取继续拼接，不会丢失。

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{trace, warn};

/// 单行最大字节数
///
/// 固件输出异常（一直没有换行）时，攒满后按一行强制交付。
pub const MAX_LINE_BYTES: usize = 4096;

/// 单次 `read()` 的缓冲大小
const READ_CHUNK: usize = 256;

/// 行源统一错误类型
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("Device Error: {0}")]
    Device(String),
    #[error("End of stream")]
    EndOfStream,
}

impl SourceError {
    /// 是否为致命错误（设备拔出、权限错误等，继续轮询没有意义）
    pub fn is_fatal(&self) -> bool {
        match self {
            SourceError::Device(_) => true,
            SourceError::EndOfStream => true,
            SourceError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::NotFound
                    | io::ErrorKind::PermissionDenied
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::NotConnected
            ),
        }
    }
}

/// 行源抽象
///
/// 每次轮询返回一行已解码、已裁剪的文本，或超时时返回 `None`。
/// 实现必须使用有界超时，使摄取循环能够在两次读取之间检查退出标志。
pub trait LineSource {
    fn read_line(&mut self) -> Result<Option<String>, SourceError>;
}

impl<S: LineSource + ?Sized> LineSource for &mut S {
    fn read_line(&mut self) -> Result<Option<String>, SourceError> {
        (**self).read_line()
    }
}

impl<S: LineSource + ?Sized> LineSource for Box<S> {
    fn read_line(&mut self) -> Result<Option<String>, SourceError> {
        (**self).read_line()
    }
}

/// 基于任意 `Read` 的行切分器
///
/// - 支持 `\n` 与 `\r\n` 行尾
/// - 非法 UTF-8 字节被丢弃
/// - `TimedOut` / `WouldBlock` 视为超时，`Interrupted` 自动重试
pub struct ReaderLineSource<R> {
    reader: R,
    pending: Vec<u8>,
}

impl<R: Read> ReaderLineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::with_capacity(READ_CHUNK),
        }
    }

    /// 尚未组成完整行的字节数
    pub fn pending_bytes(&self) -> usize {
        self.pending.len()
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn take_line(&mut self, end: usize) -> String {
        let bytes: Vec<u8> = self.pending.drain(..end).collect();
        decode_line(&bytes)
    }
}

impl<R: Read> LineSource for ReaderLineSource<R> {
    fn read_line(&mut self) -> Result<Option<String>, SourceError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
                return Ok(Some(self.take_line(pos + 1)));
            }

            if self.pending.len() >= MAX_LINE_BYTES {
                warn!(
                    "No line terminator within {} bytes, flushing as one line",
                    MAX_LINE_BYTES
                );
                return Ok(Some(self.take_line(MAX_LINE_BYTES)));
            }

            match self.reader.read(&mut chunk) {
                Ok(0) => {
                    // 流结束：最后一行可能没有换行符
                    if self.pending.is_empty() {
                        return Err(SourceError::EndOfStream);
                    }
                    let end = self.pending.len();
                    return Ok(Some(self.take_line(end)));
                },
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                    trace!("Read timeout with {} pending bytes", self.pending.len());
                    return Ok(None);
                },
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(SourceError::Io(e)),
            }
        }
    }
}

/// 字节 → 文本行：丢弃非法 UTF-8，去掉首尾空白与行尾
fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace(char::REPLACEMENT_CHARACTER, "").trim().to_string()
}

/// 串口配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// 串口设备名（如 `/dev/ttyUSB0`、`COM3`）
    pub port: String,
    /// 波特率
    pub baud_rate: u32,
    /// 单次读超时
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            read_timeout: Duration::from_secs(2),
        }
    }
}

/// 串口行源
pub type SerialLineSource = ReaderLineSource<Box<dyn serialport::SerialPort>>;

/// 打开串口
pub fn open_serial(config: &SerialConfig) -> Result<SerialLineSource, SourceError> {
    let port = serialport::new(&config.port, config.baud_rate)
        .timeout(config.read_timeout)
        .flow_control(serialport::FlowControl::None)
        .open()
        .map_err(|e| SourceError::Device(format!("{}: {}", config.port, e)))?;
    Ok(ReaderLineSource::new(port))
}

/// 打开回放文件（每行一条原始报文，读完即结束）
pub fn open_replay<P: AsRef<Path>>(path: P) -> Result<ReaderLineSource<File>, SourceError> {
    let file = File::open(path.as_ref()).map_err(|e| {
        SourceError::Device(format!("{}: {}", path.as_ref().display(), e))
    })?;
    Ok(ReaderLineSource::new(file))
}

/// 可用串口摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSummary {
    pub name: String,
    pub kind: String,
}

/// 枚举系统中的串口
pub fn available_ports() -> Result<Vec<PortSummary>, SourceError> {
    let ports = serialport::available_ports()
        .map_err(|e| SourceError::Device(format!("failed to enumerate ports: {}", e)))?;
    Ok(ports
        .into_iter()
        .map(|info| PortSummary {
            kind: port_type_name(&info.port_type),
            name: info.port_name,
        })
        .collect())
}

fn port_type_name(port_type: &serialport::SerialPortType) -> String {
    match port_type {
        serialport::SerialPortType::UsbPort(info) => match &info.product {
            Some(product) => format!("USB {:04x}:{:04x} {}", info.vid, info.pid, product),
            None => format!("USB {:04x}:{:04x}", info.vid, info.pid),
        },
        serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        serialport::SerialPortType::PciPort => "PCI".to_string(),
        serialport::SerialPortType::Unknown => "Unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Cursor;

    /// 按脚本返回数据块或错误的 Reader
    struct ScriptedReader {
        steps: VecDeque<io::Result<Vec<u8>>>,
    }

    impl ScriptedReader {
        fn new(steps: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                steps: steps.into(),
            }
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.steps.pop_front() {
                None => Ok(0),
                Some(Err(e)) => Err(e),
                Some(Ok(bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.steps.push_front(Ok(bytes[n..].to_vec()));
                    }
                    Ok(n)
                },
            }
        }
    }

    fn timeout() -> io::Error {
        io::Error::new(io::ErrorKind::TimedOut, "timeout")
    }

    #[test]
    fn test_splits_lines_and_strips_line_endings() {
        let mut source = ReaderLineSource::new(Cursor::new(b"T=1,H=2,P=3\r\nTA:22.4\n~\n".to_vec()));

        assert_eq!(source.read_line().unwrap(), Some("T=1,H=2,P=3".to_string()));
        assert_eq!(source.read_line().unwrap(), Some("TA:22.4".to_string()));
        assert_eq!(source.read_line().unwrap(), Some("~".to_string()));
        assert!(matches!(source.read_line(), Err(SourceError::EndOfStream)));
    }

    #[test]
    fn test_last_line_without_newline_is_delivered() {
        let mut source = ReaderLineSource::new(Cursor::new(b"SND".to_vec()));
        assert_eq!(source.read_line().unwrap(), Some("SND".to_string()));
        assert!(matches!(source.read_line(), Err(SourceError::EndOfStream)));
    }

    #[test]
    fn test_timeout_keeps_partial_line() {
        let reader = ScriptedReader::new(vec![
            Ok(b"T=23.4,H=".to_vec()),
            Err(timeout()),
            Ok(b"56.1,P=1012.8\n".to_vec()),
        ]);
        let mut source = ReaderLineSource::new(reader);

        assert_eq!(source.read_line().unwrap(), None);
        assert_eq!(source.pending_bytes(), 9);
        assert_eq!(source.read_line().unwrap(), Some("T=23.4,H=56.1,P=1012.8".to_string()));
        assert_eq!(source.pending_bytes(), 0);
    }

    #[test]
    fn test_interrupted_read_is_retried() {
        let reader = ScriptedReader::new(vec![
            Err(io::Error::new(io::ErrorKind::Interrupted, "signal")),
            Ok(b"~\n".to_vec()),
        ]);
        let mut source = ReaderLineSource::new(reader);
        assert_eq!(source.read_line().unwrap(), Some("~".to_string()));
    }

    #[test]
    fn test_invalid_utf8_bytes_are_dropped() {
        let mut source = ReaderLineSource::new(Cursor::new(b"T=2\xff3.4\n".to_vec()));
        assert_eq!(source.read_line().unwrap(), Some("T=23.4".to_string()));
    }

    #[test]
    fn test_blank_line_is_empty_string() {
        let mut source = ReaderLineSource::new(Cursor::new(b"  \r\nX\n".to_vec()));
        assert_eq!(source.read_line().unwrap(), Some(String::new()));
        assert_eq!(source.read_line().unwrap(), Some("X".to_string()));
    }

    #[test]
    fn test_unterminated_garbage_is_capped() {
        let mut data = vec![b'x'; MAX_LINE_BYTES + 10];
        data.push(b'\n');
        let mut source = ReaderLineSource::new(Cursor::new(data));

        let first = source.read_line().unwrap().unwrap();
        assert_eq!(first.len(), MAX_LINE_BYTES);
        let second = source.read_line().unwrap().unwrap();
        assert_eq!(second.len(), 10);
    }

    #[test]
    fn test_io_error_classification() {
        let err = SourceError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
        assert!(err.is_fatal());
        let err = SourceError::Io(io::Error::other("glitch"));
        assert!(!err.is_fatal());
        assert!(SourceError::Device("gone".to_string()).is_fatal());
    }

    #[test]
    fn test_open_replay_missing_file() {
        let err = open_replay("/nonexistent/weather/capture.txt").err().unwrap();
        assert!(matches!(err, SourceError::Device(_)));
    }

    #[test]
    fn test_serial_config_default() {
        let config = SerialConfig::default();
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.read_timeout, Duration::from_secs(2));
    }
}
