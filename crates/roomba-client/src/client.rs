//! 协议客户端
//!
//! [`RoombaClient`] 把用户意图（切换模式、驱动、清扫电机、请求遥测）
//! 翻译为 SCI 指令，并通过驱动层发送。输入使用归一化浮点值，
//! 映射和钳位由 `roomba-protocol` 完成。
//!
//! # Example
//!
//! ```
//! use roomba_client::{ClientConfig, RoombaClient};
//! use roomba_transport::MockConnector;
//! use std::time::Duration;
//!
//! let (connector, handle) = MockConnector::new();
//! let client = RoombaClient::with_connector(ClientConfig::default(), connector).unwrap();
//! client.connect().unwrap();
//! client.toggle_safe_mode().unwrap();
//! assert!(handle.wait_for_writes(1, Duration::from_secs(1)));
//! assert_eq!(handle.written(), vec![vec![131, 0]]);
//! ```

use crate::config::ClientConfig;
use crate::error::Result;
use roomba_driver::{
    ConnectionState, DriverStats, FnCallback, HookId, Motor, MotorState, Roomba, RoombaBuilder,
    TelemetrySubscription,
};
use roomba_protocol::{
    Command, DriveCommand, LedsCommand, ModeCommand, MotorsCommand, Note, PlayCommand,
    SENSOR_PACKET_FULL, SongCommand, StreamCommand, Telemetry, drive, drive_pwm, mode_toggle,
    request_sensors,
};
use roomba_transport::{Connector, Endpoint, TcpConnector};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 订阅遥测时的默认队列容量
pub const DEFAULT_SUBSCRIPTION_CAPACITY: usize = 16;

/// Roomba 协议客户端
pub struct RoombaClient {
    roomba: Roomba,
    config: ClientConfig,
}

impl RoombaClient {
    /// 使用 TCP 传输创建客户端（尚未连接）
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_connector(config, TcpConnector::default())
    }

    /// 使用自定义传输创建客户端
    pub fn with_connector<C: Connector>(config: ClientConfig, connector: C) -> Result<Self> {
        config.validate()?;
        let roomba = RoombaBuilder::new()
            .pipeline_config(config.pipeline_config())
            .build_with(connector)?;
        Ok(Self { roomba, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// 底层驱动（用于注册自定义回调等高级用法）
    pub fn driver(&self) -> &Roomba {
        &self.roomba
    }

    // ==================== 连接 ====================

    /// 连接配置中的地址
    pub fn connect(&self) -> Result<()> {
        self.connect_to(self.config.endpoint())
    }

    pub fn connect_to(&self, endpoint: Endpoint) -> Result<()> {
        info!("Connecting to {}", endpoint);
        self.roomba.connect(endpoint)?;
        Ok(())
    }

    /// 断开连接（幂等）
    ///
    /// 待合并的电机状态会先发出。总是成功。
    pub fn disconnect(&self) {
        self.roomba.disconnect();
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.roomba.connection_state()
    }

    pub fn is_connected(&self) -> bool {
        self.roomba.is_connected()
    }

    /// 发送原始指令
    pub fn send(&self, command: Command) -> Result<()> {
        self.roomba.send(command)?;
        Ok(())
    }

    // ==================== 模式 ====================

    /// 发送模式切换指令
    pub fn toggle_mode(&self, mode: ModeCommand) -> Result<()> {
        info!("Toggling {} mode", mode.name());
        self.send(mode_toggle(mode))
    }

    pub fn toggle_safe_mode(&self) -> Result<()> {
        self.toggle_mode(ModeCommand::Safe)
    }

    pub fn toggle_full_mode(&self) -> Result<()> {
        self.toggle_mode(ModeCommand::Full)
    }

    pub fn toggle_power(&self) -> Result<()> {
        self.toggle_mode(ModeCommand::Power)
    }

    pub fn toggle_spot_mode(&self) -> Result<()> {
        self.toggle_mode(ModeCommand::Spot)
    }

    pub fn toggle_cleaning_mode(&self) -> Result<()> {
        self.toggle_mode(ModeCommand::Clean)
    }

    pub fn toggle_max_mode(&self) -> Result<()> {
        self.toggle_mode(ModeCommand::Max)
    }

    pub fn toggle_dock_mode(&self) -> Result<()> {
        self.toggle_mode(ModeCommand::Dock)
    }

    /// 开启虚拟墙传感器流
    pub fn toggle_stream_mode(&self) -> Result<()> {
        info!("Toggling stream mode");
        self.send(StreamCommand::virtual_wall())
    }

    // ==================== 驱动 ====================

    /// 按速度和转弯半径驱动（归一化输入，[-1, 1]）
    pub fn drive(&self, velocity: f64, radius: f64) -> Result<()> {
        self.send(drive(velocity, radius)?)
    }

    /// 直线行驶
    pub fn drive_straight(&self, velocity: f64) -> Result<()> {
        self.send(DriveCommand::straight(velocity)?)
    }

    /// 左右驱动轮 PWM（归一化输入，量化为离散档位）
    pub fn drive_pwm(&self, left: f64, right: f64) -> Result<()> {
        self.send(drive_pwm(left, right)?)
    }

    /// 停止驱动轮
    pub fn stop(&self) -> Result<()> {
        self.drive_pwm(0.0, 0.0)
    }

    // ==================== 清扫电机 ====================

    /// 主刷（[-1, 1]，负值反转）
    pub fn set_main_brush(&self, value: f64) -> Result<()> {
        self.roomba.set_motor(Motor::MainBrush, value)?;
        Ok(())
    }

    /// 边刷（[-1, 1]，负值反转）
    pub fn set_side_brush(&self, value: f64) -> Result<()> {
        self.roomba.set_motor(Motor::SideBrush, value)?;
        Ok(())
    }

    /// 吸尘（[0, 1]）
    pub fn set_vacuum(&self, value: f64) -> Result<()> {
        self.roomba.set_motor(Motor::Vacuum, value)?;
        Ok(())
    }

    pub fn toggle_main_brush(&self) -> Result<()> {
        self.roomba.toggle_motor(Motor::MainBrush)?;
        Ok(())
    }

    pub fn toggle_side_brush(&self) -> Result<()> {
        self.roomba.toggle_motor(Motor::SideBrush)?;
        Ok(())
    }

    pub fn toggle_vacuum(&self) -> Result<()> {
        self.roomba.toggle_motor(Motor::Vacuum)?;
        Ok(())
    }

    /// 立即发送待合并的电机状态
    pub fn flush_motors(&self) -> Result<()> {
        self.roomba.flush_motors()?;
        Ok(())
    }

    /// 以设备量程直接设置三个电机（不经过去抖）
    pub fn motors_pwm(&self, state: MotorState) -> Result<()> {
        self.send(state.to_command())
    }

    /// 按位开关清扫电机 (138)
    pub fn motors(&self, mask: u8) -> Result<()> {
        self.send(MotorsCommand::new(mask).to_command())
    }

    // ==================== LED 与歌曲 ====================

    pub fn leds(&self, bits: u8, color: u8, intensity: u8) -> Result<()> {
        self.send(LedsCommand::new(bits, color, intensity).to_command())
    }

    /// 定义歌曲（最多 16 个音符）
    pub fn song(&self, number: u8, notes: &[Note]) -> Result<()> {
        self.send(SongCommand::new(number, notes).to_command()?)
    }

    pub fn play(&self, number: u8) -> Result<()> {
        self.send(PlayCommand { number }.to_command())
    }

    // ==================== 遥测 ====================

    /// 请求一次完整遥测
    pub fn request_telemetry(&self) -> Result<()> {
        self.send(request_sensors(SENSOR_PACKET_FULL))
    }

    /// 订阅传感器流
    pub fn stream(&self, packets: &[u8]) -> Result<()> {
        self.send(StreamCommand::new(packets).to_command()?)
    }

    /// 按配置的间隔开始轮询遥测
    pub fn start_polling(&self) -> Result<()> {
        self.start_polling_every(self.config.polling_interval())
    }

    /// 按指定间隔开始轮询（已在轮询时保持原有间隔）
    pub fn start_polling_every(&self, interval: Duration) -> Result<()> {
        self.roomba.start_polling(interval)?;
        Ok(())
    }

    /// 停止轮询（幂等）
    pub fn stop_polling(&self) -> Result<()> {
        self.roomba.stop_polling()?;
        Ok(())
    }

    /// 最近一帧遥测
    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.roomba.telemetry()
    }

    /// 订阅遥测更新，返回的句柄 drop 时自动注销
    pub fn subscribe(&self) -> TelemetrySubscription {
        self.roomba.subscribe(DEFAULT_SUBSCRIPTION_CAPACITY)
    }

    /// 注册遥测回调
    ///
    /// 回调在 IO 线程中执行，必须快速返回。
    pub fn on_telemetry<F>(&self, callback: F) -> HookId
    where
        F: Fn(&Telemetry) + Send + Sync + 'static,
    {
        self.roomba.add_callback(Arc::new(FnCallback(callback)))
    }

    pub fn remove_callback(&self, id: HookId) -> bool {
        self.roomba.remove_callback(id)
    }

    pub fn stats(&self) -> DriverStats {
        self.roomba.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomba_transport::{MockConnector, MockHandle};

    const WAIT: Duration = Duration::from_secs(2);

    fn client() -> (RoombaClient, MockHandle) {
        let (connector, handle) = MockConnector::new();
        let client = RoombaClient::with_connector(ClientConfig::default(), connector).unwrap();
        client.connect().unwrap();
        (client, handle)
    }

    #[test]
    fn test_mode_intents() {
        let (client, handle) = client();
        client.toggle_safe_mode().unwrap();
        client.toggle_full_mode().unwrap();
        client.toggle_power().unwrap();
        client.toggle_spot_mode().unwrap();
        client.toggle_cleaning_mode().unwrap();
        client.toggle_max_mode().unwrap();
        client.toggle_dock_mode().unwrap();

        assert!(handle.wait_for_writes(7, WAIT));
        let opcodes: Vec<u8> = handle.written().iter().map(|w| w[0]).collect();
        assert_eq!(opcodes, vec![131, 132, 133, 134, 135, 136, 143]);
        assert!(handle.written().iter().all(|w| w.len() == 2 && w[1] == 0));
    }

    #[test]
    fn test_drive_intents() {
        let (client, handle) = client();
        client.drive(1.0, 0.0).unwrap();
        client.drive_straight(-1.0).unwrap();
        client.drive_pwm(1.0, -1.0).unwrap();
        client.stop().unwrap();

        assert!(handle.wait_for_writes(4, WAIT));
        assert_eq!(
            handle.written(),
            vec![
                vec![137, 0, 0, 0, 50, 0],
                vec![137, 0x80, 0x00, 0xFF, 0xCE, 0],
                vec![146, 0xFF, 0x81, 0x00, 0x7F],
                vec![146, 0, 0, 0, 0],
            ]
        );
    }

    #[test]
    fn test_non_finite_input_rejected_before_send() {
        let (client, handle) = client();
        assert!(matches!(
            client.drive(f64::NAN, 0.0),
            Err(crate::ClientError::Protocol(_))
        ));
        assert!(client.set_vacuum(f64::INFINITY).is_err());
        std::thread::sleep(Duration::from_millis(30));
        assert!(handle.written().is_empty());
    }

    #[test]
    fn test_intent_without_connection() {
        let (connector, _handle) = MockConnector::new();
        let client = RoombaClient::with_connector(ClientConfig::default(), connector).unwrap();
        let err = client.toggle_safe_mode().unwrap_err();
        assert!(err.is_not_connected());
        assert!(client.start_polling().unwrap_err().is_not_connected());
    }

    #[test]
    fn test_extra_commands() {
        let (client, handle) = client();
        client.toggle_stream_mode().unwrap();
        client.motors(roomba_protocol::ALL_CLEANING_MOTORS_ON).unwrap();
        client.leds(roomba_protocol::LED_CLEAN_ON, 0, 255).unwrap();
        client.play(1).unwrap();

        assert!(handle.wait_for_writes(4, WAIT));
        assert_eq!(
            handle.written(),
            vec![
                vec![148, 1, 13, 0],
                vec![138, 0xFF],
                vec![139, 0x04, 0, 255],
                vec![141, 1],
            ]
        );
    }

    #[test]
    fn test_song_too_long_rejected() {
        let (client, _handle) = client();
        let notes = vec![Note::new(60, 16); 17];
        assert!(matches!(
            client.song(0, &notes),
            Err(crate::ClientError::Protocol(_))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (connector, _) = MockConnector::new();
        let config = ClientConfig {
            port: 0,
            ..ClientConfig::default()
        };
        assert!(RoombaClient::with_connector(config, connector).is_err());
    }
}
