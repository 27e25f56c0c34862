//! MockTransport 行为测试
//!
//! 上层测试依赖这些行为，这里单独固定下来。

use roomba_transport::{Connector, Endpoint, MockConnector, Transport, TransportError};
use std::io::ErrorKind;
use std::time::Duration;

fn endpoint() -> Endpoint {
    Endpoint::new("10.0.0.2", 9001)
}

const TIMEOUT: Duration = Duration::from_secs(1);

#[test]
fn test_chunks_are_read_whole() {
    let (mut connector, handle) = MockConnector::new();
    let mut transport = connector.connect(&endpoint(), TIMEOUT).unwrap();

    handle.push_incoming(vec![1u8; 26]);
    handle.push_incoming(vec![2u8; 3]);

    let mut buf = [0u8; 64];
    assert_eq!(transport.read_chunk(&mut buf).unwrap(), 26);
    assert_eq!(transport.read_chunk(&mut buf).unwrap(), 3);
    assert!(matches!(
        transport.read_chunk(&mut buf),
        Err(TransportError::Timeout)
    ));
}

#[test]
fn test_small_buffer_splits_chunk() {
    let (mut connector, handle) = MockConnector::new();
    let mut transport = connector.connect(&endpoint(), TIMEOUT).unwrap();
    handle.push_incoming(vec![9u8; 10]);

    let mut buf = [0u8; 4];
    assert_eq!(transport.read_chunk(&mut buf).unwrap(), 4);
    assert_eq!(handle.pending_incoming(), 1);
}

#[test]
fn test_remote_close_ends_session() {
    let (mut connector, handle) = MockConnector::new();
    let mut transport = connector.connect(&endpoint(), TIMEOUT).unwrap();
    handle.close_remote();

    let mut buf = [0u8; 8];
    assert!(matches!(
        transport.read_chunk(&mut buf),
        Err(TransportError::Closed)
    ));
    assert!(matches!(
        transport.write_all(&[131, 0]),
        Err(TransportError::Closed)
    ));

    // 新会话不受影响，旧会话仍然失效
    let mut fresh = connector.connect(&endpoint(), TIMEOUT).unwrap();
    assert!(fresh.write_all(&[131, 0]).is_ok());
    assert!(transport.write_all(&[131, 0]).is_err());
}

#[test]
fn test_scripted_connect_failures() {
    let (mut connector, handle) = MockConnector::new();
    handle.script_connects([false, true]);

    assert!(matches!(
        connector.connect(&endpoint(), TIMEOUT),
        Err(TransportError::Connect { .. })
    ));
    assert!(connector.connect(&endpoint(), TIMEOUT).is_ok());
    assert_eq!(handle.connect_attempts(), 2);
    assert_eq!(handle.last_endpoint(), Some(endpoint()));
}

#[test]
fn test_write_and_read_failures() {
    let (mut connector, handle) = MockConnector::new();
    let mut transport = connector.connect(&endpoint(), TIMEOUT).unwrap();

    handle.fail_writes(1);
    assert!(matches!(
        transport.write_all(&[131, 0]),
        Err(TransportError::Io(_))
    ));
    assert!(transport.write_all(&[132, 0]).is_ok());
    assert_eq!(handle.take_written(), vec![vec![132, 0]]);
    assert!(handle.written().is_empty());

    handle.fail_next_read(ErrorKind::ConnectionReset);
    let mut buf = [0u8; 8];
    let err = transport.read_chunk(&mut buf).unwrap_err();
    assert!(err.is_disconnect());
}

#[test]
fn test_shutdown_counted_once() {
    let (mut connector, handle) = MockConnector::new();
    let mut transport = connector.connect(&endpoint(), TIMEOUT).unwrap();
    transport.shutdown();
    transport.shutdown();
    assert_eq!(handle.shutdowns(), 1);
}
