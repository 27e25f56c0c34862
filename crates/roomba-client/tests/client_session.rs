//! 客户端端到端测试（内存传输）

use roomba_client::{ChargingState, ClientConfig, RoombaClient, RoombaClientBuilder};
use roomba_protocol::TELEMETRY_FRAME_LEN;
use roomba_transport::{MockConnector, MockHandle};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

fn connected(builder: RoombaClientBuilder) -> (RoombaClient, MockHandle) {
    let (connector, handle) = MockConnector::new();
    let client = builder.build_with(connector).unwrap();
    client.connect().unwrap();
    (client, handle)
}

fn charging_frame(state: u8, temperature: u8) -> Vec<u8> {
    let mut frame = vec![0u8; TELEMETRY_FRAME_LEN];
    frame[16] = state;
    frame[21] = temperature;
    frame
}

#[test]
fn test_polling_delivers_telemetry() {
    let (client, handle) = connected(RoombaClientBuilder::new().polling_interval(Duration::from_millis(10)));
    let subscription = client.subscribe();
    client.start_polling().unwrap();

    assert!(handle.wait_for_writes(1, WAIT));
    assert_eq!(handle.written()[0], vec![142, 0]);

    handle.push_incoming(charging_frame(2, 25));
    let telemetry = subscription.recv_timeout(WAIT).unwrap();
    assert_eq!(telemetry.charging_state(), Some(ChargingState::Charging));
    assert_eq!(client.telemetry().get_uint("temperature"), Some(25));

    client.stop_polling().unwrap();
    client.stop_polling().unwrap();
}

#[test]
fn test_on_telemetry_callback() {
    let (client, handle) = connected(RoombaClientBuilder::new());
    let seen = Arc::new(AtomicU64::new(0));
    let counter = seen.clone();
    let id = client.on_telemetry(move |telemetry| {
        if telemetry.len() == TELEMETRY_FRAME_LEN {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    });

    handle.push_incoming(charging_frame(0, 20));
    handle.push_incoming(vec![0u8; 3]);
    handle.push_incoming(charging_frame(0, 21));
    assert!(handle.wait_until(WAIT, |h| h.pending_incoming() == 0));
    let deadline = std::time::Instant::now() + WAIT;
    while seen.load(Ordering::Relaxed) < 2 && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(seen.load(Ordering::Relaxed), 2);
    assert_eq!(client.stats().chunks_dropped, 1);

    assert!(client.remove_callback(id));
    assert!(!client.remove_callback(id));
}

#[test]
fn test_motor_setters_coalesce_into_one_command() {
    let (client, handle) = connected(RoombaClientBuilder::new().motor_debounce(Duration::from_millis(20)));
    client.set_main_brush(0.5).unwrap();
    client.set_side_brush(-0.5).unwrap();
    client.set_vacuum(1.0).unwrap();

    assert!(handle.wait_for_writes(1, WAIT));
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(
        handle.written(),
        vec![vec![144, 64, (-64i8) as u8, 127, 0]]
    );
}

#[test]
fn test_disconnect_flushes_pending_motors() {
    let (client, handle) = connected(RoombaClientBuilder::new().motor_debounce(Duration::from_secs(10)));
    client.toggle_vacuum().unwrap();
    client.toggle_side_brush().unwrap();
    client.disconnect();

    assert_eq!(handle.written(), vec![vec![144, 0, 127, 127, 0]]);
    assert!(!client.is_connected());
    client.disconnect();
    assert!(client.toggle_safe_mode().unwrap_err().is_not_connected());
}

#[test]
fn test_connect_uses_configured_endpoint() {
    let (connector, handle) = MockConnector::new();
    let config = ClientConfig {
        host: "roomba.local".into(),
        port: 2222,
        ..ClientConfig::default()
    };
    let client = RoombaClient::with_connector(config, connector).unwrap();
    client.connect().unwrap();
    let endpoint = handle.last_endpoint().unwrap();
    assert_eq!(endpoint.to_string(), "roomba.local:2222");
}
