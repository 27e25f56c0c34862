//! 遥测监控命令

use crate::shutdown::is_running;
use anyhow::{Result, bail};
use clap::Args;
use roomba_client::{ConnectionState, RoombaClient, Telemetry};
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing::{info, warn};

/// 等待单帧的超时（用于及时响应 Ctrl-C）
const RECV_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Args, Debug)]
pub struct TelemetryCommand {
    /// 轮询间隔（毫秒，默认使用配置值）
    #[arg(short, long)]
    pub interval_ms: Option<u64>,

    /// 以 JSON 输出每一帧
    #[arg(long)]
    pub json: bool,

    /// 收到指定帧数后退出
    #[arg(short = 'n', long)]
    pub count: Option<u64>,
}

/// 单行文本格式：`name=value name=value ...`
pub fn format_line(telemetry: &Telemetry) -> String {
    let mut line = telemetry
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(" ");
    if let Some(state) = telemetry.charging_state() {
        line.push_str(&format!(" ({state:?})"));
    }
    line
}

impl TelemetryCommand {
    fn start(&self, client: &RoombaClient) -> Result<()> {
        match self.interval_ms {
            Some(ms) => client.start_polling_every(Duration::from_millis(ms))?,
            None => client.start_polling()?,
        }
        Ok(())
    }

    pub fn execute(&self, client: &RoombaClient, running: &AtomicBool) -> Result<()> {
        let subscription = client.subscribe();
        self.start(client)?;

        let mut received = 0u64;
        let mut interrupted = false;
        while is_running(running) {
            let Some(telemetry) = subscription.recv_timeout(RECV_TIMEOUT) else {
                match client.connection_state() {
                    // 会话中断后轮询不会自动恢复，重连成功后由这里重新开始
                    ConnectionState::Connected if interrupted => {
                        info!("Reconnected, restarting telemetry polling");
                        self.start(client)?;
                        interrupted = false;
                    },
                    ConnectionState::Connected => {},
                    ConnectionState::Disconnected => bail!("connection lost"),
                    state => {
                        if !interrupted {
                            warn!("Connection {}", state);
                        }
                        interrupted = true;
                    },
                }
                continue;
            };

            if self.json {
                println!("{}", serde_json::to_string(telemetry.as_ref())?);
            } else {
                println!("{}", format_line(&telemetry));
            }

            received += 1;
            if self.count.is_some_and(|count| received >= count) {
                break;
            }
        }

        client.stop_polling()?;
        Ok(())
    }
}
