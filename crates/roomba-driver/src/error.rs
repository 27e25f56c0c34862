//! 驱动层错误类型定义

use roomba_protocol::ProtocolError;
use roomba_transport::TransportError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 传输层错误
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 协议编解码错误（如非有限输入）
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 会话未建立，指令不会排队
    #[error("Not connected")]
    NotConnected,

    /// 命令通道已关闭（IO 线程退出）
    #[error("Command channel closed")]
    ChannelClosed,

    /// 命令通道已满
    #[error("Command channel full (buffer size: {0})")]
    ChannelFull(usize),

    /// 等待 IO 线程回复超时
    #[error("Operation timeout")]
    Timeout,

    /// IO 线程错误
    #[error("IO thread error: {0}")]
    IoThread(String),
}

#[cfg(test)]
mod tests {
    use super::DriverError;
    use roomba_protocol::ProtocolError;
    use roomba_transport::TransportError;

    #[test]
    fn test_driver_error_display() {
        let driver_error = DriverError::Transport(TransportError::Closed);
        assert_eq!(
            driver_error.to_string(),
            "Transport error: Connection closed by peer"
        );

        let driver_error = DriverError::Protocol(ProtocolError::InvalidLength {
            expected: 26,
            actual: 4,
        });
        assert!(driver_error.to_string().contains("Invalid frame length"));

        assert_eq!(DriverError::NotConnected.to_string(), "Not connected");
        assert_eq!(
            DriverError::ChannelClosed.to_string(),
            "Command channel closed"
        );
        assert!(DriverError::ChannelFull(64).to_string().contains("64"));
        assert_eq!(DriverError::Timeout.to_string(), "Operation timeout");

        let msg = DriverError::IoThread("panicked".to_string()).to_string();
        assert!(msg.contains("IO thread") && msg.contains("panicked"));
    }

    #[test]
    fn test_from_transport_error() {
        let driver_error: DriverError = TransportError::Timeout.into();
        assert!(matches!(
            driver_error,
            DriverError::Transport(TransportError::Timeout)
        ));
    }

    #[test]
    fn test_from_protocol_error() {
        let protocol_error = ProtocolError::NonFinite {
            field: "velocity",
            value: f64::NAN,
        };
        let driver_error: DriverError = protocol_error.into();
        match driver_error {
            DriverError::Protocol(ProtocolError::NonFinite { field, .. }) => {
                assert_eq!(field, "velocity")
            },
            _ => panic!("Expected Protocol variant"),
        }
    }
}
