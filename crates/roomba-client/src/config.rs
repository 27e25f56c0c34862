//! 客户端配置
//!
//! 加载顺序：默认值 → TOML 文件（可选）→ `ROOWIFI_*` 环境变量 → 命令行参数（由 CLI 处理）。
//!
//! ```toml
//! host = "10.0.0.2"
//! port = 9001
//! session_timeout_ms = 30000
//! polling_interval_ms = 50
//! ```

use crate::error::{ClientError, Result};
use roomba_driver::PipelineConfig;
use roomba_transport::Endpoint;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_HOST: &str = "10.0.0.2";
pub const DEFAULT_PORT: u16 = 9001;

pub const ENV_HOST: &str = "ROOWIFI_HOST";
pub const ENV_PORT: &str = "ROOWIFI_PORT";
pub const ENV_SESSION_TIMEOUT_MS: &str = "ROOWIFI_SESSION_TIMEOUT_MS";
pub const ENV_POLLING_INTERVAL_MS: &str = "ROOWIFI_POLLING_INTERVAL_MS";

/// 客户端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// 桥接模块地址
    pub host: String,
    pub port: u16,
    /// 会话空闲超时（毫秒）
    pub session_timeout_ms: u64,
    /// 遥测轮询间隔（毫秒）
    pub polling_interval_ms: u64,
    /// 中断后到重连尝试的延迟（毫秒）
    pub reconnect_delay_ms: u64,
    /// 电机指令去抖时间（毫秒）
    pub motor_debounce_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            session_timeout_ms: 30_000,
            polling_interval_ms: 50,
            reconnect_delay_ms: 1_000,
            motor_debounce_ms: 5,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ClientError::Config(format!("invalid {name}: {value:?}")))
}

impl ClientConfig {
    /// 从 TOML 文件加载（缺省字段取默认值）
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config: ClientConfig = toml::from_str(&contents)?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// 保存为 TOML 文件
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// 默认值 + 进程环境变量
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// 默认值 + 自定义环境变量查询（便于测试）
    ///
    /// # Example
    ///
    /// ```
    /// use roomba_client::ClientConfig;
    ///
    /// let config = ClientConfig::from_env_with(|name| match name {
    ///     "ROOWIFI_HOST" => Some("192.168.1.50".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.host, "192.168.1.50");
    /// assert_eq!(config.port, 9001);
    /// ```
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().with_env(lookup)
    }

    /// 在现有配置上叠加环境变量
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST)
            && !host.trim().is_empty()
        {
            self.host = host.trim().to_string();
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = parse_env(ENV_PORT, &port)?;
        }
        if let Some(timeout) = lookup(ENV_SESSION_TIMEOUT_MS) {
            self.session_timeout_ms = parse_env(ENV_SESSION_TIMEOUT_MS, &timeout)?;
        }
        if let Some(interval) = lookup(ENV_POLLING_INTERVAL_MS) {
            self.polling_interval_ms = parse_env(ENV_POLLING_INTERVAL_MS, &interval)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ClientError::Config("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(ClientError::Config("port must be non-zero".into()));
        }
        for (name, value) in [
            ("session_timeout_ms", self.session_timeout_ms),
            ("polling_interval_ms", self.polling_interval_ms),
            ("reconnect_delay_ms", self.reconnect_delay_ms),
        ] {
            if value == 0 {
                return Err(ClientError::Config(format!("{name} must be non-zero")));
            }
        }
        Ok(())
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    /// 转换为驱动层配置
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            session_timeout_ms: self.session_timeout_ms,
            reconnect_delay_ms: self.reconnect_delay_ms,
            motor_debounce_ms: self.motor_debounce_ms,
            ..PipelineConfig::default()
        }
    }
}
