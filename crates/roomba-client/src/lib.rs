//! 客户端接口模块
//!
//! 本模块提供 Roomba 的用户友好接口，包括：
//! - 模式切换、驱动、清扫电机等意图 API（归一化输入）
//! - 遥测轮询与订阅
//! - 配置加载（默认值、TOML 文件、`ROOWIFI_*` 环境变量）
//! - 摇杆输入平滑
//!
//! 如果需要直接提交原始指令或自定义传输，可以使用 `roomba-driver`。

pub mod axis;
pub mod builder;
pub mod client;
pub mod config;
mod error;

pub use axis::{AxisSmoother, DEFAULT_SMOOTHING_CAPACITY, DEFAULT_SMOOTHING_WINDOW};
pub use builder::RoombaClientBuilder;
pub use client::{DEFAULT_SUBSCRIPTION_CAPACITY, RoombaClient};
pub use config::ClientConfig;
pub use error::{ClientError, Result};

pub use roomba_driver::{ConnectionState, DriverStats, HookId, MotorState, TelemetrySubscription};
pub use roomba_protocol::{ChargingState, ModeCommand, Note, Telemetry, TelemetryValue};
pub use roomba_transport::Endpoint;
