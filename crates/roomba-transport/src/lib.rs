//! # Roomba Transport Layer
//!
//! 字节流传输抽象层。设备通过 RooWifi 串口转 WiFi 模块暴露为一个 TCP 服务，
//! 本 crate 把"建立连接"和"读写字节"拆成两个 trait：
//!
//! - [`Connector`]: 按 [`Endpoint`] 建立一个新的会话（重连时会被反复调用）
//! - [`Transport`]: 单个会话上的读写
//!
//! 后端：
//!
//! - [`tcp`]: 基于 `std::net::TcpStream` 的真实实现
//! - `mock`（feature = "mock"）: 内存实现，供驱动层和客户端测试使用

use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub mod tcp;

pub use tcp::{TcpConnector, TcpTransport};

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockConnector, MockHandle, MockTransport};

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to resolve address: {0}")]
    Resolve(String),
    #[error("Failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Read timeout")]
    Timeout,
    #[error("Connection closed by peer")]
    Closed,
}

impl TransportError {
    /// 是否表示会话已不可用（需要重连）
    ///
    /// `Timeout` 只表示本次读取没有数据，会话仍然有效。
    pub fn is_disconnect(&self) -> bool {
        !matches!(self, TransportError::Timeout)
    }
}

/// 远端地址（主机名或 IP + 端口）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// 单个会话上的字节读写
///
/// 实现者由驱动层的 IO 线程独占，因此只需要 `Send`。
pub trait Transport: Send {
    /// 写入完整的字节序列，返回时数据已交给操作系统
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// 读取一个数据块
    ///
    /// - `Ok(n)`: 收到 n 字节（n > 0）
    /// - `Err(Timeout)`: 暂无数据
    /// - `Err(Closed)`: 对端关闭
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// 非阻塞读取，暂无数据时返回 `Ok(None)`
    fn try_read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        match self.read_chunk(buf) {
            Ok(n) => Ok(Some(n)),
            Err(TransportError::Timeout) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 刷新写缓冲
    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// 关闭会话（幂等）
    fn shutdown(&mut self);
}

/// 会话工厂
pub trait Connector: Send + 'static {
    type Transport: Transport + 'static;

    /// 建立一个新会话，只有传输层连接成功后才返回 `Ok`
    fn connect(
        &mut self,
        endpoint: &Endpoint,
        timeout: Duration,
    ) -> Result<Self::Transport, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write_all(bytes)
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        (**self).read_chunk(buf)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        (**self).flush()
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }
}
