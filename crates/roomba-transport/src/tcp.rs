//! TCP 后端（RooWifi 桥接模块）
//!
//! 读操作带一个很短的超时，暂无数据时返回 [`TransportError::Timeout`]，
//! 让 IO 线程有机会处理命令队列和定时器。

use crate::{Connector, Endpoint, Transport, TransportError};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, trace};

/// 默认读超时
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(1);
/// 默认写超时
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// TCP 会话
pub struct TcpTransport {
    stream: TcpStream,
    closed: bool,
}

impl TcpTransport {
    /// 包装一个已建立的连接
    pub fn from_stream(
        stream: TcpStream,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Result<Self, TransportError> {
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(read_timeout))?;
        stream.set_write_timeout(Some(write_timeout))?;
        Ok(Self {
            stream,
            closed: false,
        })
    }

    /// 对端地址（日志用）
    pub fn peer_addr(&self) -> Option<std::net::SocketAddr> {
        self.stream.peer_addr().ok()
    }
}

impl Transport for TcpTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.stream.write_all(bytes)?;
        Ok(())
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        match self.stream.read(buf) {
            Ok(0) => Err(TransportError::Closed),
            Ok(n) => {
                trace!("read {} bytes", n);
                Ok(n)
            },
            Err(e) => match e.kind() {
                // 不同平台上读超时分别表现为 WouldBlock / TimedOut
                ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted => {
                    Err(TransportError::Timeout)
                },
                _ => Err(TransportError::Io(e)),
            },
        }
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.stream.flush()?;
        Ok(())
    }

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        // 对端可能已经关闭，忽略错误
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            debug!("TCP shutdown: {}", e);
        }
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// TCP 会话工厂
#[derive(Debug, Clone, Copy)]
pub struct TcpConnector {
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl Connector for TcpConnector {
    type Transport = TcpTransport;

    fn connect(
        &mut self,
        endpoint: &Endpoint,
        timeout: Duration,
    ) -> Result<TcpTransport, TransportError> {
        let addrs = (endpoint.host.as_str(), endpoint.port)
            .to_socket_addrs()
            .map_err(|e| TransportError::Resolve(format!("{endpoint}: {e}")))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    debug!("TCP connected to {} ({})", endpoint, addr);
                    return TcpTransport::from_stream(stream, self.read_timeout, self.write_timeout);
                },
                Err(e) => {
                    debug!("TCP connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                },
            }
        }

        match last_err {
            Some(source) => Err(TransportError::Connect {
                endpoint: endpoint.to_string(),
                source,
            }),
            None => Err(TransportError::Resolve(format!(
                "{endpoint}: no addresses"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    fn local_listener() -> (TcpListener, Endpoint) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, Endpoint::new("127.0.0.1", port))
    }

    #[test]
    fn test_connect_write_read() {
        let (listener, endpoint) = local_listener();
        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut buf = [0u8; 2];
            socket.read_exact(&mut buf).unwrap();
            assert_eq!(buf, [142, 0]);
            socket.write_all(&[7u8; 26]).unwrap();
            // 保持连接直到客户端读完
            thread::sleep(Duration::from_millis(200));
        });

        let mut transport = TcpConnector::default()
            .connect(&endpoint, Duration::from_secs(1))
            .unwrap();
        transport.write_all(&[142, 0]).unwrap();

        let mut buf = [0u8; 64];
        let mut total = 0;
        for _ in 0..1000 {
            match transport.read_chunk(&mut buf[total..]) {
                Ok(n) => total += n,
                Err(TransportError::Timeout) => {},
                Err(e) => panic!("unexpected error: {e}"),
            }
            if total >= 26 {
                break;
            }
        }
        assert_eq!(total, 26);
        server.join().unwrap();
    }

    #[test]
    fn test_read_timeout_when_idle() {
        let (listener, endpoint) = local_listener();
        let server = thread::spawn(move || {
            let (_socket, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(100));
        });

        let mut transport = TcpConnector::default()
            .connect(&endpoint, Duration::from_secs(1))
            .unwrap();
        let mut buf = [0u8; 8];
        assert!(matches!(
            transport.read_chunk(&mut buf),
            Err(TransportError::Timeout)
        ));
        assert!(transport.try_read(&mut buf).unwrap().is_none());
        server.join().unwrap();
    }

    #[test]
    fn test_peer_close_is_reported() {
        let (listener, endpoint) = local_listener();
        let server = thread::spawn(move || {
            let (socket, _) = listener.accept().unwrap();
            drop(socket);
        });

        let mut transport = TcpConnector::default()
            .connect(&endpoint, Duration::from_secs(1))
            .unwrap();
        server.join().unwrap();

        let mut buf = [0u8; 8];
        let mut result = transport.read_chunk(&mut buf);
        for _ in 0..1000 {
            if !matches!(result, Err(TransportError::Timeout)) {
                break;
            }
            result = transport.read_chunk(&mut buf);
        }
        assert!(matches!(result, Err(TransportError::Closed)));
    }

    #[test]
    fn test_connect_refused() {
        let (listener, endpoint) = local_listener();
        drop(listener);

        let result = TcpConnector::default().connect(&endpoint, Duration::from_millis(500));
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let (listener, endpoint) = local_listener();
        let server = thread::spawn(move || {
            let _ = listener.accept().unwrap();
        });

        let mut transport = TcpConnector::default()
            .connect(&endpoint, Duration::from_secs(1))
            .unwrap();
        transport.shutdown();
        transport.shutdown();
        assert!(matches!(
            transport.write_all(&[131, 0]),
            Err(TransportError::Closed)
        ));
        assert!(transport.flush().is_ok());
        server.join().unwrap();
    }
}
