//! 模式切换命令

use anyhow::Result;
use clap::Args;
use roomba_client::{ModeCommand, RoombaClient};

fn parse_mode(value: &str) -> Result<ModeCommand, String> {
    value.parse::<ModeCommand>().map_err(|e| e.to_string())
}

#[derive(Args, Debug)]
pub struct ModeArgs {
    /// 目标模式
    #[arg(value_parser = parse_mode)]
    pub mode: ModeCommand,
}

impl ModeArgs {
    pub fn execute(&self, client: &RoombaClient) -> Result<()> {
        client.toggle_mode(self.mode)?;
        println!("Sent {} mode toggle", self.mode.name());
        Ok(())
    }
}
