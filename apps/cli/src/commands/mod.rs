//! 命令定义和实现

pub mod demo;
pub mod drive;
pub mod mode;
pub mod motors;
pub mod teleop;
pub mod telemetry;

pub use demo::DemoCommand;
pub use drive::{DriveCommand, DrivePwmCommand};
pub use mode::ModeArgs;
pub use motors::MotorsCommand;
pub use teleop::TeleopCommand;
pub use telemetry::TelemetryCommand;

use anyhow::{Context, Result};
use clap::Args;
use roomba_client::ClientConfig;
use std::path::PathBuf;

/// 连接参数（命令行 > 环境变量 > 配置文件 > 默认值）
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// 桥接模块地址
    #[arg(long, global = true, env = "ROOWIFI_HOST")]
    pub host: Option<String>,

    /// 桥接模块端口
    #[arg(long, global = true, env = "ROOWIFI_PORT")]
    pub port: Option<u16>,

    /// TOML 配置文件
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

impl ConnectionArgs {
    pub fn load_config(&self) -> Result<ClientConfig> {
        let config = match &self.config {
            Some(path) => ClientConfig::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => ClientConfig::default(),
        };
        self.apply(config.with_env(|name| std::env::var(name).ok())?)
    }

    fn apply(&self, mut config: ClientConfig) -> Result<ClientConfig> {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        config.validate()?;
        Ok(config)
    }
}
