//! 共享状态定义
//!
//! IO 线程是唯一的写入者，调用方线程只读：
//!
//! - 连接状态：原子变量，无锁读取
//! - 遥测：`ArcSwap`，每帧整体替换，读取方永远看到完整的一帧
//! - 订阅者列表：`parking_lot::RwLock<HookManager>`

use crate::hooks::HookManager;
use arc_swap::ArcSwap;
use parking_lot::RwLock;
use roomba_protocol::Telemetry;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

/// 连接状态
///
/// 合法转换：
///
/// ```text
/// Disconnected → Connecting → Connected
/// Connected → Reconnecting → Connecting
/// Connecting → Disconnected（连接失败）
/// * → Disconnected（显式断开）
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ConnectionState {
    #[default]
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    /// 会话中断，已安排一次重连
    Reconnecting = 3,
}

impl ConnectionState {
    /// 从 u8 转换，无效值视为 Disconnected
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Reconnecting,
            _ => Self::Disconnected,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// 连接状态（原子版本，用于线程间共享）
#[derive(Debug, Default)]
pub struct AtomicConnectionState {
    inner: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ConnectionState) {
        self.inner.store(state.as_u8(), Ordering::Release);
    }
}

/// 共享状态上下文
pub struct RoombaContext {
    /// 最近一帧遥测（尚未收到任何帧时为空）
    pub telemetry: ArcSwap<Telemetry>,
    /// 连接状态镜像
    pub connection: AtomicConnectionState,
    /// 遥测订阅者
    pub hooks: Arc<RwLock<HookManager>>,
    /// 成功解析的遥测帧数
    pub frames_received: AtomicU64,
    /// 因长度不符被丢弃的数据块数
    pub chunks_dropped: AtomicU64,
    /// 已写出的指令数
    pub commands_sent: AtomicU64,
}

impl RoombaContext {
    pub fn new() -> Self {
        Self {
            telemetry: ArcSwap::from_pointee(Telemetry::default()),
            connection: AtomicConnectionState::new(ConnectionState::Disconnected),
            hooks: Arc::new(RwLock::new(HookManager::new())),
            frames_received: AtomicU64::new(0),
            chunks_dropped: AtomicU64::new(0),
            commands_sent: AtomicU64::new(0),
        }
    }

    /// 发布一帧新遥测并通知订阅者
    pub fn publish_telemetry(&self, telemetry: Telemetry) {
        let telemetry = Arc::new(telemetry);
        self.telemetry.store(Arc::clone(&telemetry));
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.hooks.read().trigger_all(&telemetry);
    }

    /// 快照计数器
    pub fn stats(&self) -> DriverStats {
        DriverStats {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            chunks_dropped: self.chunks_dropped.load(Ordering::Relaxed),
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
        }
    }
}

impl Default for RoombaContext {
    fn default() -> Self {
        Self::new()
    }
}

/// 计数器快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriverStats {
    pub frames_received: u64,
    pub chunks_dropped: u64,
    pub commands_sent: u64,
}
