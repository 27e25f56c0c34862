//! Pipeline IO 循环模块
//!
//! 单个后台线程独占会话、电机寄存器和所有定时器（重连、轮询、去抖）。
//! 每轮循环：
//!
//! 1. 读取入站数据块，长度为 26 的解析为遥测并发布
//! 2. 检查到期的定时器
//! 3. 在命令队列上等待，直到下一个定时器到期（已连接时最多等待 `receive_timeout_ms`）
//!
//! [`IoLoop`] 的每一步都显式接收 `now`，测试可以不依赖真实时间驱动它。

use crate::coalescer::MotorCoalescer;
use crate::command::DriverCommand;
use crate::connection::{ConnectionConfig, ConnectionManager, ReadOutcome};
use crate::error::DriverError;
use crate::state::RoombaContext;
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use roomba_protocol::{Command, SENSOR_PACKET_FULL, decode_telemetry, request_sensors};
use roomba_transport::Connector;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// 读缓冲区大小
pub const READ_BUFFER_SIZE: usize = 256;

/// 未连接时等待命令的最长时间
const DISCONNECTED_WAIT: Duration = Duration::from_millis(50);

/// 单轮循环最多读取的数据块数
const MAX_READS_PER_CYCLE: usize = 8;

/// 单轮循环最多处理的积压命令数
const MAX_DRAIN_PER_CYCLE: usize = 32;

/// Pipeline 配置
///
/// # Example
///
/// ```
/// use roomba_driver::PipelineConfig;
///
/// let config = PipelineConfig::default();
/// assert_eq!(config.session_timeout_ms, 30_000);
/// assert_eq!(config.reconnect_delay_ms, 1_000);
/// assert_eq!(config.motor_debounce_ms, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// 会话空闲超时（毫秒）
    pub session_timeout_ms: u64,
    /// 中断后到重连尝试的延迟（毫秒）
    pub reconnect_delay_ms: u64,
    /// 单次 TCP 连接超时（毫秒）
    pub connect_timeout_ms: u64,
    /// 电机指令去抖时间（毫秒）
    pub motor_debounce_ms: u64,
    /// 已连接时每轮等待命令的最长时间（毫秒），决定读取频率
    pub receive_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            session_timeout_ms: 30_000,
            reconnect_delay_ms: 1_000,
            connect_timeout_ms: 5_000,
            motor_debounce_ms: 5,
            receive_timeout_ms: 1,
        }
    }
}

impl PipelineConfig {
    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            session_timeout: Duration::from_millis(self.session_timeout_ms),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy)]
struct Polling {
    interval: Duration,
    next: Instant,
}

/// IO 线程的全部状态
pub struct IoLoop<C: Connector> {
    manager: ConnectionManager<C>,
    coalescer: MotorCoalescer,
    polling: Option<Polling>,
    ctx: Arc<RoombaContext>,
    receive_timeout: Duration,
    buf: Vec<u8>,
}

impl<C: Connector> IoLoop<C> {
    pub fn new(connector: C, ctx: Arc<RoombaContext>, config: &PipelineConfig) -> Self {
        Self {
            manager: ConnectionManager::new(connector, config.connection(), ctx.clone()),
            coalescer: MotorCoalescer::new(Duration::from_millis(config.motor_debounce_ms)),
            polling: None,
            ctx,
            receive_timeout: Duration::from_millis(config.receive_timeout_ms.max(1)),
            buf: vec![0u8; READ_BUFFER_SIZE],
        }
    }

    pub fn manager(&self) -> &ConnectionManager<C> {
        &self.manager
    }

    pub fn coalescer(&self) -> &MotorCoalescer {
        &self.coalescer
    }

    /// 当前轮询间隔（未轮询时为 `None`）
    pub fn polling_interval(&self) -> Option<Duration> {
        self.polling.map(|p| p.interval)
    }

    /// 处理一条命令
    pub fn handle(&mut self, cmd: DriverCommand, now: Instant) {
        trace!("handling {} command", cmd.kind());
        match cmd {
            DriverCommand::Connect { endpoint, reply } => {
                let result = self.manager.connect(endpoint, now);
                let _ = reply.send(result);
            },
            DriverCommand::Disconnect { reply } => {
                self.close(now);
                let _ = reply.send(());
            },
            DriverCommand::Send { command, reply } => {
                let result = self.manager.send(command.as_bytes(), now);
                match reply {
                    Some(reply) => {
                        let _ = reply.send(result);
                    },
                    None => {
                        if let Err(e) = result {
                            debug!("Dropped command {:#04x}: {}", command.opcode(), e);
                        }
                    },
                }
            },
            DriverCommand::SetMotor { motor, value } => {
                if let Err(e) = self.coalescer.set(motor, value, now) {
                    warn!("Ignoring motor setting: {}", e);
                }
            },
            DriverCommand::ToggleMotor { motor } => {
                self.coalescer.toggle(motor, now);
            },
            DriverCommand::FlushMotors => {
                if let Some(command) = self.coalescer.flush() {
                    self.write(&command, now);
                }
            },
            DriverCommand::StartPolling { interval } => self.start_polling(interval, now),
            DriverCommand::StopPolling => {
                if self.polling.take().is_some() {
                    info!("Telemetry polling stopped");
                }
            },
        }
    }

    fn start_polling(&mut self, interval: Duration, now: Instant) {
        if let Some(polling) = self.polling {
            debug!(
                "Already polling every {:?}, ignoring new interval {:?}",
                polling.interval, interval
            );
            return;
        }
        if !self.manager.is_connected() {
            debug!("Not connected, polling not started");
            return;
        }
        let interval = interval.max(Duration::from_millis(1));
        self.polling = Some(Polling {
            interval,
            next: now + interval,
        });
        info!("Telemetry polling started ({:?})", interval);
    }

    /// 写入并记录失败（不向调用方返回）
    fn write(&mut self, command: &Command, now: Instant) {
        match self.manager.send(command.as_bytes(), now) {
            Ok(()) => {},
            Err(DriverError::NotConnected) => {
                debug!("Dropped command {:#04x}: not connected", command.opcode())
            },
            // 传输错误已在 ConnectionManager 中记录
            Err(_) => {},
        }
    }

    fn handle_chunk(ctx: &RoombaContext, chunk: &[u8]) {
        match decode_telemetry(chunk) {
            Ok(telemetry) => ctx.publish_telemetry(telemetry),
            Err(e) => {
                ctx.chunks_dropped.fetch_add(1, Ordering::Relaxed);
                trace!("Dropping chunk {}: {}", hex::encode(chunk), e);
            },
        }
    }

    /// 读取数据并处理到期的定时器
    pub fn service(&mut self, now: Instant) {
        for _ in 0..MAX_READS_PER_CYCLE {
            match self.manager.poll_read(&mut self.buf, now) {
                ReadOutcome::Data(n) => Self::handle_chunk(&self.ctx, &self.buf[..n]),
                ReadOutcome::Idle | ReadOutcome::Disrupted => break,
            }
        }

        self.manager.tick(now);

        if let Some(command) = self.coalescer.poll(now) {
            self.write(&command, now);
        }

        let poll_due = match self.polling.as_mut() {
            Some(polling) if now >= polling.next => {
                polling.next = now + polling.interval;
                true
            },
            _ => false,
        };
        if poll_due {
            self.write(&request_sensors(SENSOR_PACKET_FULL), now);
        }

        // 会话中断后不恢复轮询
        if !self.manager.is_connected() && self.polling.take().is_some() {
            debug!("Connection lost, telemetry polling stopped");
        }
    }

    /// 距离下一个定时器到期的时间
    pub fn wait_timeout(&self, now: Instant) -> Duration {
        let cap = if self.manager.is_connected() {
            self.receive_timeout
        } else {
            DISCONNECTED_WAIT
        };
        [
            self.manager.next_deadline(),
            self.coalescer.deadline(),
            self.polling.map(|p| p.next),
        ]
        .into_iter()
        .flatten()
        .min()
        .map_or(cap, |deadline| deadline.saturating_duration_since(now).min(cap))
    }

    /// 优雅关闭：先发出待合并的电机状态，再停止轮询并关闭会话
    pub fn close(&mut self, now: Instant) {
        if let Some(command) = self.coalescer.flush() {
            self.write(&command, now);
        }
        self.coalescer.reset();
        self.polling = None;
        self.manager.disconnect();
    }
}

/// IO 线程主循环
///
/// 命令通道断开（驱动句柄被 drop）时优雅关闭并退出。
pub fn io_loop<C: Connector>(
    connector: C,
    cmd_rx: Receiver<DriverCommand>,
    ctx: Arc<RoombaContext>,
    config: PipelineConfig,
) {
    let mut io = IoLoop::new(connector, ctx, &config);

    loop {
        io.service(Instant::now());

        let wait = io.wait_timeout(Instant::now());
        match cmd_rx.recv_timeout(wait) {
            Ok(cmd) => {
                io.handle(cmd, Instant::now());
                for _ in 0..MAX_DRAIN_PER_CYCLE {
                    match cmd_rx.try_recv() {
                        Ok(cmd) => io.handle(cmd, Instant::now()),
                        Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                    }
                }
            },
            Err(RecvTimeoutError::Timeout) => {},
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    io.close(Instant::now());
    debug!("IO loop exited");
}
