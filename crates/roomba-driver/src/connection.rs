//! 连接管理
//!
//! [`ConnectionManager`] 只在 IO 线程中使用，独占传输会话。
//! 所有涉及时间的方法都显式接收 `now`，由调用方提供时钟，
//! 因此状态机可以用确定的时间点测试。
//!
//! 会话中断（空闲超时、对端关闭、读写错误）时：
//!
//! 1. 关闭当前会话
//! 2. 进入 `Reconnecting`，在 `reconnect_delay` 之后安排**一次**重连
//! 3. 重连失败回到 `Disconnected`，直到调用方再次 `connect()`
//!
//! 处于 `Reconnecting` 期间的后续中断不会再次安排重连。

use crate::error::DriverError;
use crate::state::{ConnectionState, RoombaContext};
use roomba_transport::{Connector, Endpoint, Transport, TransportError};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// 连接参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// 会话空闲超时（无读写活动）
    pub session_timeout: Duration,
    /// 中断后到重连尝试的延迟
    pub reconnect_delay: Duration,
    /// 单次 TCP 连接超时
    pub connect_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            session_timeout: Duration::from_millis(30_000),
            reconnect_delay: Duration::from_millis(1_000),
            connect_timeout: Duration::from_millis(5_000),
        }
    }
}

/// 一次读取的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// 收到 n 字节
    Data(usize),
    /// 暂无数据
    Idle,
    /// 会话已中断（已安排重连或已在重连中）
    Disrupted,
}

/// 连接状态机
pub struct ConnectionManager<C: Connector> {
    connector: C,
    config: ConnectionConfig,
    ctx: Arc<RoombaContext>,
    endpoint: Option<Endpoint>,
    transport: Option<C::Transport>,
    state: ConnectionState,
    last_activity: Instant,
    reconnect_at: Option<Instant>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, config: ConnectionConfig, ctx: Arc<RoombaContext>) -> Self {
        Self {
            connector,
            config,
            ctx,
            endpoint: None,
            transport: None,
            state: ConnectionState::Disconnected,
            last_activity: Instant::now(),
            reconnect_at: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    /// 已安排的重连时间点
    pub fn reconnect_at(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// 下一个需要 `tick()` / `poll_read()` 处理的时间点
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            ConnectionState::Connected => Some(self.last_activity + self.config.session_timeout),
            ConnectionState::Reconnecting => self.reconnect_at,
            _ => None,
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            trace!("connection state: {} -> {}", self.state, state);
        }
        self.state = state;
        self.ctx.connection.set(state);
    }

    /// 建立会话
    ///
    /// 已连接时直接返回 `Ok`（不比较地址）。
    /// 失败时状态回到 `Disconnected`。
    pub fn connect(&mut self, endpoint: Endpoint, now: Instant) -> Result<(), DriverError> {
        if self.is_connected() {
            debug!("connect() while connected to {:?}, ignoring", self.endpoint);
            return Ok(());
        }
        self.reconnect_at = None;
        self.endpoint = Some(endpoint.clone());
        self.open(&endpoint, now).map_err(DriverError::from)
    }

    fn open(&mut self, endpoint: &Endpoint, now: Instant) -> Result<(), TransportError> {
        self.set_state(ConnectionState::Connecting);
        match self.connector.connect(endpoint, self.config.connect_timeout) {
            Ok(transport) => {
                self.transport = Some(transport);
                self.last_activity = now;
                self.set_state(ConnectionState::Connected);
                info!("Connected to {}", endpoint);
                Ok(())
            },
            Err(e) => {
                warn!("Failed to connect to {}: {}", endpoint, e);
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            },
        }
    }

    /// 关闭会话（幂等）
    ///
    /// 同时取消已安排的重连。返回是否真正关闭了一个会话。
    pub fn disconnect(&mut self) -> bool {
        self.reconnect_at = None;
        let had_session = match self.transport.take() {
            Some(mut transport) => {
                if let Err(e) = transport.flush() {
                    debug!("flush before disconnect failed: {}", e);
                }
                transport.shutdown();
                true
            },
            None => false,
        };
        if had_session || self.state != ConnectionState::Disconnected {
            info!("Disconnected");
        }
        self.set_state(ConnectionState::Disconnected);
        had_session
    }

    /// 写入一条指令
    ///
    /// 未连接时返回 `NotConnected`，不会排队。
    /// 写失败时关闭会话、安排重连，并把错误返回给调用方。
    pub fn send(&mut self, bytes: &[u8], now: Instant) -> Result<(), DriverError> {
        let Some(transport) = self.transport.as_mut().filter(|_| self.state.is_connected()) else {
            return Err(DriverError::NotConnected);
        };
        match transport.write_all(bytes) {
            Ok(()) => {
                trace!("TX {}", hex::encode(bytes));
                self.last_activity = now;
                self.ctx.commands_sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            },
            Err(e) => {
                warn!("Write failed: {}", e);
                self.disrupt(now);
                Err(DriverError::Transport(e))
            },
        }
    }

    /// 读取一个数据块，同时检查空闲超时
    pub fn poll_read(&mut self, buf: &mut [u8], now: Instant) -> ReadOutcome {
        let Some(transport) = self.transport.as_mut().filter(|_| self.state.is_connected()) else {
            return ReadOutcome::Idle;
        };
        match transport.read_chunk(buf) {
            Ok(n) => {
                self.last_activity = now;
                ReadOutcome::Data(n)
            },
            Err(TransportError::Timeout) => {
                if now.saturating_duration_since(self.last_activity) >= self.config.session_timeout {
                    warn!(
                        "Session idle for {:?}, closing",
                        self.config.session_timeout
                    );
                    self.disrupt(now);
                    ReadOutcome::Disrupted
                } else {
                    ReadOutcome::Idle
                }
            },
            Err(TransportError::Closed) => {
                warn!("Connection closed by peer");
                self.disrupt(now);
                ReadOutcome::Disrupted
            },
            Err(e) => {
                warn!("Read failed: {}", e);
                self.disrupt(now);
                ReadOutcome::Disrupted
            },
        }
    }

    /// 处理会话中断：关闭会话，安排一次重连
    pub fn disrupt(&mut self, now: Instant) {
        if let Some(mut transport) = self.transport.take() {
            transport.shutdown();
        }
        if self.state == ConnectionState::Reconnecting {
            return;
        }
        if self.endpoint.is_none() {
            self.set_state(ConnectionState::Disconnected);
            return;
        }
        self.reconnect_at = Some(now + self.config.reconnect_delay);
        self.set_state(ConnectionState::Reconnecting);
        debug!("Reconnect scheduled in {:?}", self.config.reconnect_delay);
    }

    /// 处理到期的重连
    pub fn tick(&mut self, now: Instant) {
        let Some(at) = self.reconnect_at else {
            return;
        };
        if now < at {
            return;
        }
        self.reconnect_at = None;
        let Some(endpoint) = self.endpoint.clone() else {
            self.set_state(ConnectionState::Disconnected);
            return;
        };
        debug!("Reconnecting to {}", endpoint);
        if self.open(&endpoint, now).is_err() {
            warn!("Reconnect to {} failed, staying disconnected", endpoint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomba_transport::{MockConnector, MockHandle};
    use std::io::ErrorKind;

    const DELAY: Duration = Duration::from_millis(1_000);
    const IDLE: Duration = Duration::from_millis(30_000);

    fn manager() -> (ConnectionManager<MockConnector>, MockHandle, Arc<RoombaContext>) {
        let (connector, handle) = MockConnector::new();
        let ctx = Arc::new(RoombaContext::new());
        let manager = ConnectionManager::new(connector, ConnectionConfig::default(), ctx.clone());
        (manager, handle, ctx)
    }

    fn endpoint() -> Endpoint {
        Endpoint::new("10.0.0.2", 9001)
    }

    #[test]
    fn test_connect_and_send() {
        let (mut manager, handle, ctx) = manager();
        let t0 = Instant::now();
        manager.connect(endpoint(), t0).unwrap();
        assert_eq!(manager.state(), ConnectionState::Connected);
        assert_eq!(ctx.connection.get(), ConnectionState::Connected);

        manager.send(&[131, 0], t0).unwrap();
        assert_eq!(handle.written(), vec![vec![131, 0]]);
        assert_eq!(ctx.stats().commands_sent, 1);
    }

    #[test]
    fn test_connect_while_connected_is_noop() {
        let (mut manager, handle, _) = manager();
        let t0 = Instant::now();
        manager.connect(endpoint(), t0).unwrap();
        manager.connect(endpoint(), t0).unwrap();
        assert_eq!(handle.connect_attempts(), 1);
    }

    #[test]
    fn test_failed_connect_leaves_disconnected() {
        let (mut manager, handle, _) = manager();
        handle.script_connects([false]);
        let result = manager.connect(endpoint(), Instant::now());
        assert!(matches!(result, Err(DriverError::Transport(_))));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.reconnect_at().is_none());
    }

    #[test]
    fn test_send_when_disconnected() {
        let (mut manager, handle, _) = manager();
        let result = manager.send(&[131, 0], Instant::now());
        assert!(matches!(result, Err(DriverError::NotConnected)));
        assert!(handle.written().is_empty());
    }

    #[test]
    fn test_double_disconnect_is_harmless() {
        let (mut manager, handle, _) = manager();
        manager.connect(endpoint(), Instant::now()).unwrap();
        assert!(manager.disconnect());
        assert!(!manager.disconnect());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(handle.shutdowns(), 1);
    }

    #[test]
    fn test_remote_close_schedules_one_reconnect() {
        let (mut manager, handle, _) = manager();
        let t0 = Instant::now();
        manager.connect(endpoint(), t0).unwrap();

        handle.close_remote();
        let mut buf = [0u8; 64];
        assert_eq!(manager.poll_read(&mut buf, t0), ReadOutcome::Disrupted);
        assert_eq!(manager.state(), ConnectionState::Reconnecting);
        assert_eq!(manager.reconnect_at(), Some(t0 + DELAY));

        // 重连期间的后续中断不会重新安排
        manager.disrupt(t0 + Duration::from_millis(500));
        assert_eq!(manager.reconnect_at(), Some(t0 + DELAY));
        assert_eq!(manager.poll_read(&mut buf, t0), ReadOutcome::Idle);

        manager.tick(t0 + Duration::from_millis(999));
        assert_eq!(handle.connect_attempts(), 1);

        manager.tick(t0 + DELAY);
        assert_eq!(handle.connect_attempts(), 2);
        assert_eq!(manager.state(), ConnectionState::Connected);

        manager.tick(t0 + DELAY * 3);
        assert_eq!(handle.connect_attempts(), 2);
    }

    #[test]
    fn test_idle_timeout_triggers_reconnect() {
        let (mut manager, handle, _) = manager();
        let t0 = Instant::now();
        manager.connect(endpoint(), t0).unwrap();
        assert_eq!(manager.next_deadline(), Some(t0 + IDLE));

        let mut buf = [0u8; 64];
        assert_eq!(
            manager.poll_read(&mut buf, t0 + IDLE - Duration::from_millis(1)),
            ReadOutcome::Idle
        );
        assert_eq!(manager.poll_read(&mut buf, t0 + IDLE), ReadOutcome::Disrupted);
        assert_eq!(manager.state(), ConnectionState::Reconnecting);
        assert_eq!(handle.shutdowns(), 1);
    }

    #[test]
    fn test_activity_resets_idle_timer() {
        let (mut manager, handle, _) = manager();
        let t0 = Instant::now();
        manager.connect(endpoint(), t0).unwrap();

        let later = t0 + Duration::from_millis(20_000);
        manager.send(&[142, 0], later).unwrap();
        let mut buf = [0u8; 64];
        assert_eq!(manager.poll_read(&mut buf, t0 + IDLE), ReadOutcome::Idle);

        handle.push_incoming(vec![0u8; 26]);
        assert_eq!(manager.poll_read(&mut buf, t0 + IDLE), ReadOutcome::Data(26));
        assert_eq!(manager.next_deadline(), Some(t0 + IDLE + IDLE));
    }

    #[test]
    fn test_write_error_schedules_reconnect() {
        let (mut manager, handle, _) = manager();
        let t0 = Instant::now();
        manager.connect(endpoint(), t0).unwrap();
        handle.fail_writes(1);

        let result = manager.send(&[131, 0], t0);
        assert!(matches!(result, Err(DriverError::Transport(_))));
        assert_eq!(manager.state(), ConnectionState::Reconnecting);
        assert!(matches!(
            manager.send(&[131, 0], t0),
            Err(DriverError::NotConnected)
        ));
    }

    #[test]
    fn test_read_error_schedules_reconnect() {
        let (mut manager, handle, _) = manager();
        let t0 = Instant::now();
        manager.connect(endpoint(), t0).unwrap();
        handle.fail_next_read(ErrorKind::ConnectionReset);

        let mut buf = [0u8; 64];
        assert_eq!(manager.poll_read(&mut buf, t0), ReadOutcome::Disrupted);
        assert_eq!(manager.state(), ConnectionState::Reconnecting);
    }

    #[test]
    fn test_failed_reconnect_ends_disconnected() {
        let (mut manager, handle, _) = manager();
        let t0 = Instant::now();
        manager.connect(endpoint(), t0).unwrap();
        handle.script_connects([false]);
        handle.close_remote();

        let mut buf = [0u8; 64];
        manager.poll_read(&mut buf, t0);
        manager.tick(t0 + DELAY);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.reconnect_at().is_none());
        assert_eq!(handle.connect_attempts(), 2);

        // 不会自动再次尝试
        manager.tick(t0 + DELAY * 10);
        assert_eq!(handle.connect_attempts(), 2);
    }

    #[test]
    fn test_disconnect_cancels_pending_reconnect() {
        let (mut manager, handle, _) = manager();
        let t0 = Instant::now();
        manager.connect(endpoint(), t0).unwrap();
        handle.close_remote();
        let mut buf = [0u8; 64];
        manager.poll_read(&mut buf, t0);
        assert!(manager.reconnect_at().is_some());

        manager.disconnect();
        assert!(manager.reconnect_at().is_none());
        manager.tick(t0 + DELAY);
        assert_eq!(handle.connect_attempts(), 1);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_connect_during_reconnecting_connects_now() {
        let (mut manager, handle, _) = manager();
        let t0 = Instant::now();
        manager.connect(endpoint(), t0).unwrap();
        handle.close_remote();
        let mut buf = [0u8; 64];
        manager.poll_read(&mut buf, t0);

        manager.connect(endpoint(), t0).unwrap();
        assert!(manager.is_connected());
        assert!(manager.reconnect_at().is_none());
        assert_eq!(handle.connect_attempts(), 2);
    }
}
