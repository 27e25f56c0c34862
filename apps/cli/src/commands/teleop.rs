//! 遥控命令
//!
//! 从标准输入逐行读取 `left right` 两个 0..=255 的摇杆原始值
//! （0 为最上，255 为最下），经时间窗口平均后每个周期下发一次 `drive_pwm`。
//! 标准输入结束或 Ctrl-C 时停车退出。重连期间跳过下发，连接彻底断开时退出。

use crate::shutdown::is_running;
use anyhow::{Result, bail};
use clap::Args;
use crossbeam_channel::{Receiver, TryRecvError, bounded};
use roomba_client::{
    AxisSmoother, ConnectionState, DEFAULT_SMOOTHING_CAPACITY, DEFAULT_SMOOTHING_WINDOW,
    RoombaClient,
};
use std::io::BufRead;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Args, Debug)]
pub struct TeleopCommand {
    /// 下发周期（毫秒）
    #[arg(long, default_value_t = 50)]
    pub period_ms: u64,

    /// 平滑缓冲区容量
    #[arg(long, default_value_t = DEFAULT_SMOOTHING_CAPACITY)]
    pub smoothing: usize,

    /// 平滑窗口（毫秒）
    #[arg(long, default_value_t = DEFAULT_SMOOTHING_WINDOW.as_millis() as u64)]
    pub window_ms: u64,
}

/// 解析一行摇杆输入
pub fn parse_stick_line(line: &str) -> Option<(u8, u8)> {
    let mut parts = line.split_whitespace();
    let left = parts.next()?.parse().ok()?;
    let right = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((left, right))
}

fn spawn_stdin_reader() -> Receiver<(u8, u8)> {
    let (tx, rx) = bounded(1024);
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_stick_line(&line) {
                Some(sample) => {
                    if tx.send(sample).is_err() {
                        break;
                    }
                },
                None if line.trim().is_empty() => {},
                None => warn!("Ignoring malformed input: {:?}", line),
            }
        }
    });
    rx
}

/// 下发一次驱动指令
///
/// 会话中断（重连中）时跳过并返回 `Ok(false)`；连接彻底断开时返回错误。
pub fn drive_or_skip(client: &RoombaClient, left: f64, right: f64) -> Result<bool> {
    match client.drive_pwm(left, right) {
        Ok(()) => Ok(true),
        Err(e) if e.is_not_connected() => match client.connection_state() {
            ConnectionState::Disconnected => bail!("connection lost"),
            state => {
                debug!("Skipping drive command while {}", state);
                Ok(false)
            },
        },
        Err(e) => Err(e.into()),
    }
}

impl TeleopCommand {
    pub fn execute(&self, client: &RoombaClient, running: &AtomicBool) -> Result<()> {
        let period = Duration::from_millis(self.period_ms.max(1));
        let window = Duration::from_millis(self.window_ms);
        let mut left = AxisSmoother::new(self.smoothing, window);
        let mut right = AxisSmoother::new(self.smoothing, window);
        let samples = spawn_stdin_reader();
        info!("Teleop started, reading `left right` stick values from stdin");

        let mut paused = false;
        while is_running(running) {
            thread::sleep(period);

            let mut input_closed = false;
            loop {
                match samples.try_recv() {
                    Ok((l, r)) => {
                        let now = Instant::now();
                        left.push_raw(l, now);
                        right.push_raw(r, now);
                    },
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        input_closed = true;
                        break;
                    },
                }
            }
            if input_closed {
                info!("Input closed");
                break;
            }

            let now = Instant::now();
            let sent = drive_or_skip(client, left.average(now), right.average(now))?;
            match (sent, paused) {
                (false, false) => {
                    warn!("Connection {}, pausing drive commands", client.connection_state());
                    paused = true;
                },
                (true, true) => {
                    info!("Connection restored, resuming drive commands");
                    paused = false;
                },
                _ => {},
            }
        }

        if let Err(e) = client.stop() {
            warn!("Failed to stop wheels: {}", e);
        }
        Ok(())
    }
}
