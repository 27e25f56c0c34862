//! 驱动层模块
//!
//! 本模块提供 Roomba 会话的运行时，包括：
//! - IO 线程管理（单线程独占会话与所有定时器）
//! - 连接生命周期（空闲超时、一次性延迟重连）
//! - 遥测同步（ArcSwap 无锁读取）与订阅
//! - 清扫电机指令的去抖合并
//!
//! 大多数用户应该使用 `roomba-client` 提供的更高级接口。

mod builder;
pub mod coalescer;
pub mod command;
pub mod connection;
mod error;
pub mod hooks;
pub mod pipeline;
mod roomba;
pub mod state;

pub use builder::RoombaBuilder;
pub use coalescer::{DEFAULT_MOTOR_DEBOUNCE, Motor, MotorCoalescer, MotorState};
pub use command::{COMMAND_QUEUE_CAPACITY, DriverCommand};
pub use connection::{ConnectionConfig, ConnectionManager, ReadOutcome};
pub use error::DriverError;
pub use hooks::{
    ChannelCallback, FnCallback, HookId, HookManager, TelemetryCallback, TelemetrySubscription,
};
pub use pipeline::{IoLoop, PipelineConfig, io_loop};
pub use roomba::Roomba;
pub use state::*;
