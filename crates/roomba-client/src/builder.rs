//! Client 层 Builder
//!
//! ```
//! use roomba_client::RoombaClientBuilder;
//! use roomba_transport::MockConnector;
//! use std::time::Duration;
//!
//! let (connector, _handle) = MockConnector::new();
//! let client = RoombaClientBuilder::new()
//!     .host("192.168.1.50")
//!     .polling_interval(Duration::from_millis(100))
//!     .build_with(connector)
//!     .unwrap();
//! assert_eq!(client.config().polling_interval_ms, 100);
//! ```

use crate::client::RoombaClient;
use crate::config::ClientConfig;
use crate::error::Result;
use roomba_transport::Connector;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct RoombaClientBuilder {
    config: ClientConfig,
}

impl RoombaClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以完整配置为起点
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// 从 TOML 文件加载配置
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        self.config = ClientConfig::from_file(path)?;
        Ok(self)
    }

    /// 叠加 `ROOWIFI_*` 环境变量
    pub fn with_env(mut self) -> Result<Self> {
        self.config = self.config.with_env(|name| std::env::var(name).ok())?;
        Ok(self)
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.config.session_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn polling_interval(mut self, interval: Duration) -> Self {
        self.config.polling_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn motor_debounce(mut self, debounce: Duration) -> Self {
        self.config.motor_debounce_ms = debounce.as_millis() as u64;
        self
    }

    /// 构建使用 TCP 传输的客户端
    pub fn build(self) -> Result<RoombaClient> {
        RoombaClient::new(self.config)
    }

    pub fn build_with<C: Connector>(self, connector: C) -> Result<RoombaClient> {
        RoombaClient::with_connector(self.config, connector)
    }
}
