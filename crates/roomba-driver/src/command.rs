//! IO 线程命令定义
//!
//! 调用方线程通过有界 channel 向 IO 线程提交这些命令，按 FIFO 顺序处理。

use crate::coalescer::Motor;
use crate::error::DriverError;
use crossbeam_channel::Sender;
use roomba_protocol::Command;
use roomba_transport::Endpoint;
use std::time::Duration;

/// 命令队列容量
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// 写入确认（OS 接受写入后回复）
pub type WriteReply = Sender<Result<(), DriverError>>;

/// 发往 IO 线程的命令
#[derive(Debug)]
pub enum DriverCommand {
    /// 建立会话，完成后回复结果
    Connect {
        endpoint: Endpoint,
        reply: Sender<Result<(), DriverError>>,
    },
    /// 刷新电机状态、停止轮询并关闭会话
    Disconnect { reply: Sender<()> },
    /// 写入一条指令，`reply` 为 `None` 时不等待确认
    Send {
        command: Command,
        reply: Option<WriteReply>,
    },
    /// 设置电机（归一化值，已校验为有限值）
    SetMotor { motor: Motor, value: f64 },
    /// 切换电机开关
    ToggleMotor { motor: Motor },
    /// 立即发送待合并的电机状态
    FlushMotors,
    /// 开始周期性请求遥测（已在轮询时忽略）
    StartPolling { interval: Duration },
    /// 停止轮询
    StopPolling,
}

impl DriverCommand {
    /// 日志用的简短名称
    pub fn kind(&self) -> &'static str {
        match self {
            DriverCommand::Connect { .. } => "connect",
            DriverCommand::Disconnect { .. } => "disconnect",
            DriverCommand::Send { .. } => "send",
            DriverCommand::SetMotor { .. } => "set_motor",
            DriverCommand::ToggleMotor { .. } => "toggle_motor",
            DriverCommand::FlushMotors => "flush_motors",
            DriverCommand::StartPolling { .. } => "start_polling",
            DriverCommand::StopPolling => "stop_polling",
        }
    }
}
