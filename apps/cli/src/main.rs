//! # Roomba CLI
//!
//! Command-line interface for a Roomba behind a RooWifi serial-to-WiFi bridge.
//!
//! ```bash
//! # 打印遥测直到 Ctrl-C
//! roomba-cli --host 10.0.0.2 telemetry --json
//!
//! # 切换模式
//! roomba-cli mode safe
//!
//! # 以一半速度直行 2 秒
//! roomba-cli drive 0.5 --straight --duration-ms 2000
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

mod commands;
mod shutdown;

use commands::{
    ConnectionArgs, DemoCommand, DriveCommand, DrivePwmCommand, ModeArgs, MotorsCommand,
    TeleopCommand, TelemetryCommand,
};

/// Roomba CLI - 扫地机器人命令行工具
#[derive(Parser, Debug)]
#[command(name = "roomba-cli")]
#[command(about = "Command-line interface for Roomba SCI over a RooWifi bridge", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 轮询并打印遥测，直到 Ctrl-C
    Telemetry {
        #[command(flatten)]
        args: TelemetryCommand,
    },

    /// 切换模式（safe, full, power, spot, clean, max, dock）
    Mode {
        #[command(flatten)]
        args: ModeArgs,
    },

    /// 按速度和转弯半径驱动
    Drive {
        #[command(flatten)]
        args: DriveCommand,
    },

    /// 直接设置左右驱动轮 PWM
    DrivePwm {
        #[command(flatten)]
        args: DrivePwmCommand,
    },

    /// 设置清扫电机
    Motors {
        #[command(flatten)]
        args: MotorsCommand,
    },

    /// 刷子演示序列
    Demo {
        #[command(flatten)]
        args: DemoCommand,
    },

    /// 从标准输入读取摇杆值遥控驱动轮
    Teleop {
        #[command(flatten)]
        args: TeleopCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("roomba_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let running = shutdown::install()?;

    let config = cli.connection.load_config()?;
    let client = roomba_client::RoombaClient::new(config)?;
    client.connect()?;

    let result = match cli.command {
        Commands::Telemetry { args } => args.execute(&client, &running),
        Commands::Mode { args } => args.execute(&client),
        Commands::Drive { args } => args.execute(&client, &running),
        Commands::DrivePwm { args } => args.execute(&client, &running),
        Commands::Motors { args } => args.execute(&client, &running),
        Commands::Demo { args } => args.execute(&client, &running),
        Commands::Teleop { args } => args.execute(&client, &running),
    };

    // 无论命令是否成功都优雅断开
    client.disconnect();
    info!("Roomba disconnected");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_mode() {
        let cli = Cli::try_parse_from(["roomba-cli", "--host", "192.168.1.9", "mode", "safe"]).unwrap();
        assert_eq!(cli.connection.host.as_deref(), Some("192.168.1.9"));
        assert!(matches!(cli.command, Commands::Mode { .. }));
    }

    #[test]
    fn test_parse_negative_drive_values() {
        let cli = Cli::try_parse_from(["roomba-cli", "drive", "-0.5", "-1"]).unwrap();
        match cli.command {
            Commands::Drive { args } => {
                assert_eq!(args.velocity, -0.5);
                assert_eq!(args.radius, -1.0);
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Cli::try_parse_from(["roomba-cli", "mode", "turbo"]).is_err());
    }
}
