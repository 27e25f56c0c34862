//! Builder 模式实现
//!
//! 提供链式构造 [`Roomba`] 实例的便捷方式。

use crate::error::DriverError;
use crate::pipeline::PipelineConfig;
use crate::roomba::Roomba;
use roomba_transport::{Connector, TcpConnector};
use std::time::Duration;

/// Roomba Builder（链式构造）
///
/// # Example
///
/// ```
/// use roomba_driver::RoombaBuilder;
/// use roomba_transport::MockConnector;
/// use std::time::Duration;
///
/// let (connector, _handle) = MockConnector::new();
/// let roomba = RoombaBuilder::new()
///     .session_timeout(Duration::from_secs(10))
///     .motor_debounce(Duration::from_millis(10))
///     .build_with(connector)
///     .unwrap();
/// assert_eq!(roomba.config().session_timeout_ms, 10_000);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RoombaBuilder {
    config: PipelineConfig,
}

impl RoombaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置 Pipeline 配置（覆盖之前的单项设置）
    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 会话空闲超时（默认 30 秒）
    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.config.session_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// 中断后到重连尝试的延迟（默认 1 秒）
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// 电机指令去抖时间（默认 5 毫秒）
    pub fn motor_debounce(mut self, debounce: Duration) -> Self {
        self.config.motor_debounce_ms = debounce.as_millis() as u64;
        self
    }

    /// 构建使用 TCP 传输的实例
    pub fn build(self) -> Result<Roomba, DriverError> {
        self.build_with(TcpConnector::default())
    }

    /// 使用自定义传输构建
    pub fn build_with<C: Connector>(self, connector: C) -> Result<Roomba, DriverError> {
        Roomba::new(connector, self.config)
    }
}
