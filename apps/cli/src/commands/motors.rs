//! 清扫电机命令

use crate::shutdown::sleep_while_running;
use anyhow::Result;
use clap::Args;
use roomba_client::RoombaClient;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing::info;

#[derive(Args, Debug)]
pub struct MotorsCommand {
    /// 主刷 [-1, 1]
    #[arg(long, allow_negative_numbers = true)]
    pub main: Option<f64>,

    /// 边刷 [-1, 1]
    #[arg(long, allow_negative_numbers = true)]
    pub side: Option<f64>,

    /// 吸尘 [0, 1]
    #[arg(long)]
    pub vacuum: Option<f64>,

    /// 运行时间（毫秒），到时关闭所有电机
    #[arg(long)]
    pub duration_ms: Option<u64>,
}

impl MotorsCommand {
    pub fn execute(&self, client: &RoombaClient, running: &AtomicBool) -> Result<()> {
        if let Some(value) = self.main {
            client.set_main_brush(value)?;
        }
        if let Some(value) = self.side {
            client.set_side_brush(value)?;
        }
        if let Some(value) = self.vacuum {
            client.set_vacuum(value)?;
        }
        client.flush_motors()?;
        info!(
            "Motors: main={:?} side={:?} vacuum={:?}",
            self.main, self.side, self.vacuum
        );

        if let Some(ms) = self.duration_ms {
            sleep_while_running(running, Duration::from_millis(ms));
            client.set_main_brush(0.0)?;
            client.set_side_brush(0.0)?;
            client.set_vacuum(0.0)?;
            client.flush_motors()?;
            info!("Motors off");
        }
        Ok(())
    }
}
