//! 传输层抽象
//!
//! 提供 Connector/LineTransport traits 使会话状态机与具体传输实现解耦。
//! 协议是纯文本按行的：服务器以 `\n`、`\r\n` 或 `\r` 结束一行，
//! 客户端以一个回车符冲刷结束一行。

#[cfg(any(test, feature = "test-util"))]
use std::collections::VecDeque;
#[cfg(any(test, feature = "test-util"))]
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{ProtocolError, Result};
use crate::{CONNECT_TIMEOUT, MAX_LINE_LEN, SERVER_BASE_PORT};

/// 按行收发的连接抽象
#[async_trait]
pub trait LineTransport: Send {
    /// 读取一行（不含行尾），对端关闭时返回 `None`
    async fn read_line(&mut self) -> Result<Option<String>>;

    /// 写入字节
    async fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// 冲刷写缓冲
    async fn flush(&mut self) -> Result<()>;

    /// 关闭连接，重复关闭为空操作
    async fn close(&mut self) -> Result<()>;

    /// 获取远端地址
    fn peer_addr(&self) -> Option<String> {
        None
    }

    /// 发送一行：文本后跟回车并冲刷
    async fn send_line(&mut self, line: &str) -> Result<()> {
        debug!(line, "sending");
        self.write(line.as_bytes()).await?;
        self.write(b"\r").await?;
        self.flush().await
    }
}

/// 连接器 trait（客户端使用）
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: LineTransport;

    /// 连接到 `host` 上第 `server` 个逻辑端口
    async fn connect(&self, host: &str, server: u16) -> Result<Self::Conn>;
}

// ============================================================================
// TCP 实现
// ============================================================================

/// TCP 连接器
#[derive(Debug, Clone, Copy)]
pub struct TcpConnector {
    /// 逻辑端口 0 对应的实际端口
    pub base_port: u16,
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self {
            base_port: SERVER_BASE_PORT,
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Conn = TcpLineTransport;

    async fn connect(&self, host: &str, server: u16) -> Result<Self::Conn> {
        let port = self.base_port.checked_add(server).ok_or_else(|| {
            ProtocolError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("server offset {} out of range", server),
            ))
        })?;

        let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port)))
            .await
            .map_err(|_| ProtocolError::ConnectionTimeout)?
            .map_err(ProtocolError::Io)?;

        stream.set_nodelay(true)?;
        debug!(host, port, "connected");
        TcpLineTransport::from_stream(stream)
    }
}

/// TCP 按行连接
pub struct TcpLineTransport {
    reader: Option<BufReader<OwnedReadHalf>>,
    writer: Option<BufWriter<OwnedWriteHalf>>,
    peer_addr: Option<String>,
    /// 上一行以 `\r` 结束，紧随的 `\n` 属于同一行尾
    skip_lf: bool,
}

impl TcpLineTransport {
    /// 从 TcpStream 创建
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        let peer_addr = stream.peer_addr().ok().map(|a| a.to_string());
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: Some(BufReader::new(read_half)),
            writer: Some(BufWriter::new(write_half)),
            peer_addr,
            skip_lf: false,
        })
    }
}

fn check_line_len(line: &[u8]) -> Result<()> {
    if line.len() > MAX_LINE_LEN {
        return Err(ProtocolError::Framing {
            line: String::from_utf8_lossy(&line[..64]).into_owned(),
            reason: "line too long",
        });
    }
    Ok(())
}

fn decode_line(line: Vec<u8>) -> Result<String> {
    String::from_utf8(line).map_err(|e| ProtocolError::Framing {
        line: String::from_utf8_lossy(e.as_bytes()).into_owned(),
        reason: "invalid utf-8",
    })
}

#[async_trait]
impl LineTransport for TcpLineTransport {
    async fn read_line(&mut self) -> Result<Option<String>> {
        let reader = self.reader.as_mut().ok_or(ProtocolError::ConnectionClosed)?;
        let mut line = Vec::new();

        loop {
            let buf = reader.fill_buf().await?;
            if buf.is_empty() {
                // 对端关闭：残留的半行仍作为最后一行返回
                return if line.is_empty() {
                    Ok(None)
                } else {
                    decode_line(line).map(Some)
                };
            }

            let skip = usize::from(self.skip_lf && buf[0] == b'\n');
            self.skip_lf = false;

            match buf[skip..].iter().position(|b| *b == b'\n' || *b == b'\r') {
                Some(pos) => {
                    line.extend_from_slice(&buf[skip..skip + pos]);
                    self.skip_lf = buf[skip + pos] == b'\r';
                    reader.consume(skip + pos + 1);
                    check_line_len(&line)?;
                    return decode_line(line).map(Some);
                }
                None => {
                    let consumed = buf.len();
                    line.extend_from_slice(&buf[skip..]);
                    reader.consume(consumed);
                    check_line_len(&line)?;
                }
            }
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(ProtocolError::ConnectionClosed)?;
        writer.write_all(bytes).await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(ProtocolError::ConnectionClosed)?;
        writer.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.reader = None;
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown().await?;
            debug!(peer = ?self.peer_addr, "connection closed");
        }
        Ok(())
    }

    fn peer_addr(&self) -> Option<String> {
        self.peer_addr.clone()
    }
}

// ============================================================================
// 内存脚本实现（仅测试，外部 crate 需启用 `test-util` feature）
// ============================================================================

/// 脚本连接的共享状态
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
struct ScriptState {
    incoming: VecDeque<String>,
    written: Vec<u8>,
    flushes: usize,
    closes: usize,
    closed: bool,
    fail_close: bool,
}

/// 按预设脚本应答的内存连接
///
/// 克隆共享同一状态，交给会话后仍可从克隆上检查发送内容和关闭次数。
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<ScriptState>>,
}

#[cfg(any(test, feature = "test-util"))]
impl ScriptedTransport {
    /// 以服务器将依次发送的行创建
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let transport = Self::default();
        transport.lock().incoming = lines.into_iter().map(Into::into).collect();
        transport
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 追加一行服务器消息
    pub fn push_line(&self, line: impl Into<String>) {
        self.lock().incoming.push_back(line.into());
    }

    /// 客户端已发送的各行（按回车切分）
    pub fn sent_lines(&self) -> Vec<String> {
        let state = self.lock();
        String::from_utf8_lossy(&state.written)
            .split('\r')
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// 尚未被读取的服务器消息数
    pub fn pending(&self) -> usize {
        self.lock().incoming.len()
    }

    /// 冲刷次数
    pub fn flush_count(&self) -> usize {
        self.lock().flushes
    }

    /// 实际关闭次数（重复关闭不计）
    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// 之后的关闭仍释放连接，但返回 I/O 错误
    pub fn fail_close(&self) {
        self.lock().fail_close = true;
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl LineTransport for ScriptedTransport {
    async fn read_line(&mut self) -> Result<Option<String>> {
        let mut state = self.lock();
        if state.closed {
            return Err(ProtocolError::ConnectionClosed);
        }
        Ok(state.incoming.pop_front())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(ProtocolError::ConnectionClosed);
        }
        state.written.extend_from_slice(bytes);
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(ProtocolError::ConnectionClosed);
        }
        state.flushes += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.lock();
        if !state.closed {
            state.closed = true;
            state.closes += 1;
            if state.fail_close {
                return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into());
            }
        }
        Ok(())
    }

    fn peer_addr(&self) -> Option<String> {
        Some("script".to_string())
    }
}
