//! 刷子演示序列
//!
//! 安全模式 → 主刷开 → 主刷关 + 边刷开 → 边刷关，每步间隔 `--step-ms`。

use crate::shutdown::sleep_while_running;
use anyhow::Result;
use clap::Args;
use roomba_client::RoombaClient;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing::info;

#[derive(Args, Debug)]
pub struct DemoCommand {
    /// 步骤间隔（毫秒）
    #[arg(long, default_value_t = 1000)]
    pub step_ms: u64,
}

impl DemoCommand {
    pub fn execute(&self, client: &RoombaClient, running: &AtomicBool) -> Result<()> {
        let step = Duration::from_millis(self.step_ms);

        if !sleep_while_running(running, step) {
            return Ok(());
        }
        info!("Toggling safe mode");
        client.toggle_safe_mode()?;

        if !sleep_while_running(running, step) {
            return Ok(());
        }
        info!("Setting main brush to 1");
        client.set_main_brush(1.0)?;

        if !sleep_while_running(running, step) {
            return Ok(());
        }
        info!("Setting main brush to 0, side brush to 1");
        client.set_main_brush(0.0)?;
        client.set_side_brush(1.0)?;

        if !sleep_while_running(running, step) {
            return Ok(());
        }
        info!("Setting side brush to 0");
        client.set_side_brush(0.0)?;
        Ok(())
    }
}
