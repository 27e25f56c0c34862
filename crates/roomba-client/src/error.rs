//! 客户端错误类型定义

use roomba_driver::DriverError;
use roomba_protocol::ProtocolError;
use thiserror::Error;

/// 客户端错误类型
#[derive(Error, Debug)]
pub enum ClientError {
    /// 驱动层错误（未连接、通道关闭、传输错误等）
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// 输入无法编码为指令
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 配置无效
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl ClientError {
    /// 是否为“未连接”错误
    pub fn is_not_connected(&self) -> bool {
        matches!(self, ClientError::Driver(DriverError::NotConnected))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let err: ClientError = DriverError::NotConnected.into();
        assert!(err.is_not_connected());
        assert_eq!(err.to_string(), "Driver error: Not connected");

        let err: ClientError = ProtocolError::NonFinite {
            field: "velocity",
            value: f64::NAN,
        }
        .into();
        assert!(matches!(err, ClientError::Protocol(_)));
        assert!(!err.is_not_connected());
    }

    #[test]
    fn test_config_error_display() {
        let err = ClientError::Config("port must be non-zero".into());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: port must be non-zero"
        );
    }
}
