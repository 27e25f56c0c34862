//! 内存传输后端（测试用）
//!
//! [`MockConnector`] 产生的每个 [`MockTransport`] 与一个 [`MockHandle`] 共享状态：
//! 测试通过 handle 注入入站数据块、模拟对端关闭或写失败，并检查写出的字节。
//!
//! ```rust
//! use roomba_transport::{Connector, Endpoint, MockConnector, Transport};
//! use std::time::Duration;
//!
//! let (mut connector, handle) = MockConnector::new();
//! let mut transport = connector
//!     .connect(&Endpoint::new("10.0.0.2", 9001), Duration::from_secs(1))
//!     .unwrap();
//! transport.write_all(&[131, 0]).unwrap();
//! assert_eq!(handle.written(), vec![vec![131, 0]]);
//! ```

use crate::{Connector, Endpoint, Transport, TransportError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct MockState {
    /// 当前会话编号（每次成功 connect 递增）
    session: u64,
    connect_attempts: usize,
    /// 依次弹出，`false` 表示这次 connect 失败
    connect_script: VecDeque<bool>,
    endpoints: Vec<Endpoint>,
    incoming: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    fail_writes: usize,
    remote_closed: bool,
    read_error: Option<ErrorKind>,
    shutdowns: usize,
}

/// 测试侧句柄
#[derive(Debug, Clone, Default)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    /// 注入一个入站数据块（会被一次 `read_chunk` 完整读出）
    pub fn push_incoming(&self, chunk: impl Into<Vec<u8>>) {
        self.state.lock().incoming.push_back(chunk.into());
    }

    /// 模拟对端关闭当前会话
    pub fn close_remote(&self) {
        self.state.lock().remote_closed = true;
    }

    /// 下一次读取返回 IO 错误
    pub fn fail_next_read(&self, kind: ErrorKind) {
        self.state.lock().read_error = Some(kind);
    }

    /// 接下来 `count` 次写入失败
    pub fn fail_writes(&self, count: usize) {
        self.state.lock().fail_writes = count;
    }

    /// 按顺序设定接下来几次 connect 的结果
    pub fn script_connects(&self, results: impl IntoIterator<Item = bool>) {
        self.state.lock().connect_script.extend(results);
    }

    /// 已写出的所有指令（按写入顺序）
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().written.clone()
    }

    /// 取出并清空已写出的指令
    pub fn take_written(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.state.lock().written)
    }

    /// connect 调用次数（含失败）
    pub fn connect_attempts(&self) -> usize {
        self.state.lock().connect_attempts
    }

    /// 最近一次 connect 的目标地址
    pub fn last_endpoint(&self) -> Option<Endpoint> {
        self.state.lock().endpoints.last().cloned()
    }

    /// `shutdown()` 调用次数（重复调用同一会话只计一次）
    pub fn shutdowns(&self) -> usize {
        self.state.lock().shutdowns
    }

    /// 尚未被读取的入站数据块数
    pub fn pending_incoming(&self) -> usize {
        self.state.lock().incoming.len()
    }

    /// 轮询等待条件成立，超时返回 false
    pub fn wait_until(&self, timeout: Duration, mut condition: impl FnMut(&MockHandle) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if condition(self) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// 等待至少写出 `count` 条指令
    pub fn wait_for_writes(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |h| h.state.lock().written.len() >= count)
    }
}

/// 内存会话
#[derive(Debug)]
pub struct MockTransport {
    session: u64,
    shut_down: bool,
    handle: MockHandle,
}

impl MockTransport {
    fn is_current(&self, state: &MockState) -> bool {
        !self.shut_down && !state.remote_closed && state.session == self.session
    }
}

impl Transport for MockTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut state = self.handle.state.lock();
        if !self.is_current(&state) {
            return Err(TransportError::Closed);
        }
        if state.fail_writes > 0 {
            state.fail_writes -= 1;
            return Err(TransportError::Io(std::io::Error::new(
                ErrorKind::BrokenPipe,
                "mock write failure",
            )));
        }
        state.written.push(bytes.to_vec());
        Ok(())
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let mut state = self.handle.state.lock();
        if !self.is_current(&state) {
            return Err(TransportError::Closed);
        }
        if let Some(kind) = state.read_error.take() {
            return Err(TransportError::Io(std::io::Error::new(kind, "mock read failure")));
        }
        let Some(mut chunk) = state.incoming.pop_front() else {
            return Err(TransportError::Timeout);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            let rest = chunk.split_off(n);
            state.incoming.push_front(rest);
        }
        Ok(n)
    }

    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.handle.state.lock().shutdowns += 1;
    }
}

/// 内存会话工厂
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    handle: MockHandle,
}

impl MockConnector {
    /// 创建工厂和对应的测试句柄
    pub fn new() -> (Self, MockHandle) {
        let handle = MockHandle::default();
        (
            Self {
                handle: handle.clone(),
            },
            handle,
        )
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    fn connect(
        &mut self,
        endpoint: &Endpoint,
        _timeout: Duration,
    ) -> Result<MockTransport, TransportError> {
        let mut state = self.handle.state.lock();
        state.connect_attempts += 1;
        state.endpoints.push(endpoint.clone());
        if !state.connect_script.pop_front().unwrap_or(true) {
            return Err(TransportError::Connect {
                endpoint: endpoint.to_string(),
                source: std::io::Error::new(ErrorKind::ConnectionRefused, "mock connect refused"),
            });
        }
        state.session += 1;
        state.remote_closed = false;
        Ok(MockTransport {
            session: state.session,
            shut_down: false,
            handle: self.handle.clone(),
        })
    }
}
