//! vm-trace: 地址访问 trace 读取
//!
//! trace 文件由定长 12 字节、小端序的记录组成：
//!
//! | 字段    | 类型 | 说明           |
//! |---------|------|----------------|
//! | addr    | u32  | 虚拟地址       |
//! | reqtype | u8   | 请求类型       |
//! | size    | u8   | 访问大小       |
//! | attr    | u8   | 属性           |
//! | proc    | u8   | 处理器编号     |
//! | time    | u32  | 时间戳         |
//!
//! [`TraceReader`] 逐条惰性读取，不预先知道记录总数。

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read};
use std::path::Path;

use thiserror::Error;

/// Trace reading errors
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Unable to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error while reading trace: {0}")]
    Io(#[from] io::Error),
}

/// 一条 trace 记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraceRecord {
    pub address: u32,
    pub reqtype: u8,
    pub size: u8,
    pub attr: u8,
    pub proc: u8,
    pub time: u32,
}

impl TraceRecord {
    /// 记录的字节数
    pub const RECORD_SIZE: usize = 12;

    pub fn new(address: u32) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    pub fn from_bytes(bytes: &[u8; Self::RECORD_SIZE]) -> Self {
        Self {
            address: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            reqtype: bytes[4],
            size: bytes[5],
            attr: bytes[6],
            proc: bytes[7],
            time: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::RECORD_SIZE] {
        let mut bytes = [0u8; Self::RECORD_SIZE];
        bytes[0..4].copy_from_slice(&self.address.to_le_bytes());
        bytes[4] = self.reqtype;
        bytes[5] = self.size;
        bytes[6] = self.attr;
        bytes[7] = self.proc;
        bytes[8..12].copy_from_slice(&self.time.to_le_bytes());
        bytes
    }
}

/// trace 读取器
///
/// 干净的文件结尾结束迭代；结尾不足一条完整记录时丢弃残余字节并结束迭代。
pub struct TraceReader<R: Read> {
    inner: BufReader<R>,
    records_read: u64,
    finished: bool,
}

impl TraceReader<File> {
    pub fn open(path: &Path) -> Result<Self, TraceError> {
        let file = File::open(path).map_err(|source| TraceError::Open {
            path: path.display().to_string(),
            source,
        })?;
        log::debug!("Opened trace file {}", path.display());
        Ok(Self::new(file))
    }
}

impl<R: Read> TraceReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            records_read: 0,
            finished: false,
        }
    }

    /// 已读取的完整记录数
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// 读取下一条记录，文件结束时返回 `Ok(None)`
    pub fn next_record(&mut self) -> Result<Option<TraceRecord>, TraceError> {
        if self.finished {
            return Ok(None);
        }

        let mut buf = [0u8; TraceRecord::RECORD_SIZE];
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.finished = true;
                    return Err(e.into());
                }
            }
        }

        if filled < buf.len() {
            self.finished = true;
            if filled > 0 {
                log::warn!(
                    "Ignoring truncated trace record ({} of {} bytes) after {} records",
                    filled,
                    TraceRecord::RECORD_SIZE,
                    self.records_read
                );
            }
            return Ok(None);
        }

        self.records_read += 1;
        Ok(Some(TraceRecord::from_bytes(&buf)))
    }
}

impl<R: Read> Iterator for TraceReader<R> {
    type Item = Result<TraceRecord, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
