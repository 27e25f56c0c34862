//! 驱动句柄
//!
//! [`Roomba`] 持有命令通道的发送端和共享状态。所有会话操作都在后台 IO 线程中执行，
//! 句柄本身可以在多个线程间共享（`&self` 方法）。

use crate::coalescer::Motor;
use crate::command::{COMMAND_QUEUE_CAPACITY, DriverCommand};
use crate::error::DriverError;
use crate::hooks::{HookId, HookManager, TelemetryCallback, TelemetrySubscription};
use crate::pipeline::{PipelineConfig, io_loop};
use crate::state::{ConnectionState, DriverStats, RoombaContext};
use crossbeam_channel::{RecvTimeoutError, Sender, TrySendError, bounded};
use parking_lot::RwLock;
use roomba_protocol::{Command, Telemetry, ensure_finite};
use roomba_transport::{Connector, Endpoint};
use std::mem::ManuallyDrop;
use std::sync::Arc;
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{debug, error, warn};

/// 等待 IO 线程回复时，在连接超时之外额外等待的时间
const REPLY_MARGIN: Duration = Duration::from_secs(2);

/// Drop 时等待 IO 线程退出的最长时间
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// 带超时的线程 join
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();
        // 由看门狗线程代为 join，超时后看门狗线程继续运行
        spawn(move || {
            let _ = tx.send(self.join());
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// Roomba 驱动
///
/// # Example
///
/// ```
/// use roomba_driver::{ConnectionState, PipelineConfig, Roomba};
/// use roomba_transport::{Endpoint, MockConnector};
///
/// let (connector, handle) = MockConnector::new();
/// let roomba = Roomba::new(connector, PipelineConfig::default()).unwrap();
/// roomba.connect(Endpoint::new("10.0.0.2", 9001)).unwrap();
/// assert_eq!(roomba.connection_state(), ConnectionState::Connected);
///
/// roomba.send_confirmed(roomba_protocol::request_sensors(0), std::time::Duration::from_secs(1)).unwrap();
/// assert_eq!(handle.written(), vec![vec![142, 0]]);
/// ```
pub struct Roomba {
    /// 命令发送端（Drop 时先于 join 释放，让 IO 线程看到通道关闭）
    cmd_tx: ManuallyDrop<Sender<DriverCommand>>,
    ctx: Arc<RoombaContext>,
    config: PipelineConfig,
    io_thread: Option<JoinHandle<()>>,
}

impl Roomba {
    /// 创建驱动并启动 IO 线程
    ///
    /// 此时尚未连接，需要调用 [`Roomba::connect`]。
    pub fn new<C: Connector>(connector: C, config: PipelineConfig) -> Result<Self, DriverError> {
        let (cmd_tx, cmd_rx) = bounded(COMMAND_QUEUE_CAPACITY);
        let ctx = Arc::new(RoombaContext::new());

        let thread_ctx = ctx.clone();
        let thread_config = config.clone();
        let io_thread = std::thread::Builder::new()
            .name("roomba-io".into())
            .spawn(move || io_loop(connector, cmd_rx, thread_ctx, thread_config))
            .map_err(|e| DriverError::IoThread(e.to_string()))?;

        Ok(Self {
            cmd_tx: ManuallyDrop::new(cmd_tx),
            ctx,
            config,
            io_thread: Some(io_thread),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 非阻塞提交命令
    fn submit(&self, cmd: DriverCommand) -> Result<(), DriverError> {
        self.cmd_tx.try_send(cmd).map_err(|e| match e {
            TrySendError::Full(_) => DriverError::ChannelFull(COMMAND_QUEUE_CAPACITY),
            TrySendError::Disconnected(_) => DriverError::ChannelClosed,
        })
    }

    /// 阻塞提交命令（用于连接/断开这类必须送达的请求）
    fn submit_blocking(&self, cmd: DriverCommand) -> Result<(), DriverError> {
        self.cmd_tx.send(cmd).map_err(|_| DriverError::ChannelClosed)
    }

    /// IO 线程处理到排队命令前可能还在执行一次重连，最长 `connect_timeout`
    fn reply_wait(&self, attempts: u32) -> Duration {
        self.config.connect_timeout() * attempts + REPLY_MARGIN
    }

    /// 建立会话（阻塞直到成功或失败）
    ///
    /// 已连接时立即返回 `Ok`。
    pub fn connect(&self, endpoint: Endpoint) -> Result<(), DriverError> {
        debug!("Connecting to {}", endpoint);
        let (reply, rx) = bounded(1);
        self.submit_blocking(DriverCommand::Connect { endpoint, reply })?;
        match rx.recv_timeout(self.reply_wait(2)) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(DriverError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(DriverError::ChannelClosed),
        }
    }

    /// 关闭会话（幂等，总是成功）
    ///
    /// 先发出待合并的电机状态，再停止轮询并关闭连接。
    /// IO 线程卡在一次重连中超过等待时间时，状态先置为 `Disconnected`，
    /// 排队的断开命令随后完成关闭。
    pub fn disconnect(&self) {
        let (reply, rx) = bounded(1);
        if self.submit_blocking(DriverCommand::Disconnect { reply }).is_err() {
            debug!("IO thread already stopped, nothing to disconnect");
            self.ctx.connection.set(ConnectionState::Disconnected);
            return;
        }
        match rx.recv_timeout(self.reply_wait(1)) {
            Ok(()) => {},
            Err(RecvTimeoutError::Timeout) => {
                warn!("IO thread busy, disconnect will complete in the background");
                self.ctx.connection.set(ConnectionState::Disconnected);
            },
            Err(RecvTimeoutError::Disconnected) => {
                self.ctx.connection.set(ConnectionState::Disconnected);
            },
        }
    }

    /// 发送一条指令（不等待写入确认）
    ///
    /// 未连接时返回 [`DriverError::NotConnected`]，指令不会排队等待连接。
    pub fn send(&self, command: Command) -> Result<(), DriverError> {
        if !self.is_connected() {
            return Err(DriverError::NotConnected);
        }
        self.submit(DriverCommand::Send {
            command,
            reply: None,
        })
    }

    /// 发送一条指令并等待写入结果
    pub fn send_confirmed(&self, command: Command, timeout: Duration) -> Result<(), DriverError> {
        if !self.is_connected() {
            return Err(DriverError::NotConnected);
        }
        let (reply, rx) = bounded(1);
        self.submit(DriverCommand::Send {
            command,
            reply: Some(reply),
        })?;
        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(DriverError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(DriverError::ChannelClosed),
        }
    }

    /// 设置电机（归一化值），经去抖合并后发送
    ///
    /// 不要求已连接；未连接时合并后的指令在 IO 线程中被丢弃。
    pub fn set_motor(&self, motor: Motor, value: f64) -> Result<(), DriverError> {
        let value = ensure_finite(motor.name(), value)?;
        self.submit(DriverCommand::SetMotor { motor, value })
    }

    /// 切换电机开关
    pub fn toggle_motor(&self, motor: Motor) -> Result<(), DriverError> {
        self.submit(DriverCommand::ToggleMotor { motor })
    }

    /// 立即发送待合并的电机状态
    pub fn flush_motors(&self) -> Result<(), DriverError> {
        self.submit(DriverCommand::FlushMotors)
    }

    /// 开始周期性请求完整遥测
    ///
    /// 已在轮询时保持原有间隔。会话中断后轮询自动停止，不随重连恢复。
    pub fn start_polling(&self, interval: Duration) -> Result<(), DriverError> {
        if !self.is_connected() {
            return Err(DriverError::NotConnected);
        }
        self.submit(DriverCommand::StartPolling { interval })
    }

    pub fn stop_polling(&self) -> Result<(), DriverError> {
        self.submit(DriverCommand::StopPolling)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.ctx.connection.get()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }

    /// 最近一帧遥测（尚未收到时为空表）
    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.ctx.telemetry.load_full()
    }

    pub fn stats(&self) -> DriverStats {
        self.ctx.stats()
    }

    /// 钩子管理器（用于注册自定义回调）
    pub fn hooks(&self) -> Arc<RwLock<HookManager>> {
        Arc::clone(&self.ctx.hooks)
    }

    /// 订阅遥测，返回的句柄 drop 时自动注销
    pub fn subscribe(&self, capacity: usize) -> TelemetrySubscription {
        TelemetrySubscription::register(&self.ctx.hooks, capacity)
    }

    pub fn add_callback(&self, callback: Arc<dyn TelemetryCallback>) -> HookId {
        self.ctx.hooks.write().add_callback(callback)
    }

    pub fn remove_callback(&self, id: HookId) -> bool {
        self.ctx.hooks.write().remove_callback(id)
    }

    /// 等待下一帧遥测
    pub fn wait_for_telemetry(&self, timeout: Duration) -> Result<Arc<Telemetry>, DriverError> {
        self.subscribe(1)
            .recv_timeout(timeout)
            .ok_or(DriverError::Timeout)
    }
}

impl Drop for Roomba {
    fn drop(&mut self) {
        // 必须在 join 之前释放 Sender，IO 线程才会看到通道关闭并优雅退出
        unsafe {
            ManuallyDrop::drop(&mut self.cmd_tx);
        }

        if let Some(handle) = self.io_thread.take()
            && let Err(_e) = handle.join_timeout(JOIN_TIMEOUT)
        {
            error!(
                "IO thread panicked or failed to shut down within {:?}",
                JOIN_TIMEOUT
            );
        }
    }
}
