//! 驱动命令
//!
//! 输入为归一化值。指定 `--duration-ms` 时持续该时间后停止，否则只发送一次。

use crate::shutdown::sleep_while_running;
use anyhow::Result;
use clap::Args;
use roomba_client::RoombaClient;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing::info;

#[derive(Args, Debug)]
pub struct DriveCommand {
    /// 速度 [-1, 1]
    #[arg(allow_negative_numbers = true)]
    pub velocity: f64,

    /// 转弯半径 [-1, 1]
    #[arg(allow_negative_numbers = true, default_value_t = 0.0)]
    pub radius: f64,

    /// 直行（忽略半径）
    #[arg(long)]
    pub straight: bool,

    /// 持续时间（毫秒），到时停止
    #[arg(long)]
    pub duration_ms: Option<u64>,
}

impl DriveCommand {
    pub fn execute(&self, client: &RoombaClient, running: &AtomicBool) -> Result<()> {
        if self.straight {
            client.drive_straight(self.velocity)?;
        } else {
            client.drive(self.velocity, self.radius)?;
        }
        info!("Driving: velocity={} radius={}", self.velocity, self.radius);

        if let Some(ms) = self.duration_ms {
            sleep_while_running(running, Duration::from_millis(ms));
            client.drive(0.0, 0.0)?;
            info!("Stopped");
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct DrivePwmCommand {
    /// 左轮 [-1, 1]
    #[arg(allow_negative_numbers = true)]
    pub left: f64,

    /// 右轮 [-1, 1]
    #[arg(allow_negative_numbers = true)]
    pub right: f64,

    /// 持续时间（毫秒），到时停止
    #[arg(long)]
    pub duration_ms: Option<u64>,
}

impl DrivePwmCommand {
    pub fn execute(&self, client: &RoombaClient, running: &AtomicBool) -> Result<()> {
        client.drive_pwm(self.left, self.right)?;
        info!("Drive PWM: left={} right={}", self.left, self.right);

        if let Some(ms) = self.duration_ms {
            sleep_while_running(running, Duration::from_millis(ms));
            client.stop()?;
            info!("Stopped");
        }
        Ok(())
    }
}
