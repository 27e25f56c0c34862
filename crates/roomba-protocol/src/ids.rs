//! Opcode 与传感器包 ID 常量定义
//!
//! 每条指令的第一个字节是 opcode，数值来自设备的 SCI 规范。

use num_enum::{IntoPrimitive, TryFromPrimitive};

// ============================================================================
// 模式指令
// ============================================================================

/// 进入安全模式
pub const OPCODE_SAFE: u8 = 131;
/// 进入完全控制模式
pub const OPCODE_FULL: u8 = 132;
/// 关机（电源键）
pub const OPCODE_POWER: u8 = 133;
/// 定点清扫
pub const OPCODE_SPOT: u8 = 134;
/// 常规清扫
pub const OPCODE_CLEAN: u8 = 135;
/// 强力清扫
pub const OPCODE_MAX: u8 = 136;
/// 回充座
pub const OPCODE_DOCK: u8 = 143;

// ============================================================================
// 执行器指令
// ============================================================================

/// 驱动轮（速度 + 转弯半径）
pub const OPCODE_DRIVE: u8 = 137;
/// 清扫电机开关（位掩码）
pub const OPCODE_MOTORS: u8 = 138;
/// LED 控制
pub const OPCODE_LEDS: u8 = 139;
/// 定义歌曲
pub const OPCODE_SONG: u8 = 140;
/// 播放歌曲
pub const OPCODE_PLAY: u8 = 141;
/// 清扫电机 PWM
pub const OPCODE_MOTORS_PWM: u8 = 144;
/// 驱动轮 PWM（左右独立）
pub const OPCODE_DRIVE_PWM: u8 = 146;

// ============================================================================
// 传感器指令
// ============================================================================

/// 请求一次传感器包
pub const OPCODE_SENSORS: u8 = 142;
/// 开启/关闭传感器流
pub const OPCODE_STREAM: u8 = 148;

/// 完整传感器包（26 字节）
pub const SENSOR_PACKET_FULL: u8 = 0;
/// 虚拟墙传感器包
pub const VIRTUAL_WALL_PACKET: u8 = 13;
/// 流模式响应包头
pub const STREAM_RESPONSE_PACKET: u8 = 19;

/// SCI opcode 枚举
///
/// 主要用于日志输出和入参校验，构建指令时直接使用 `OPCODE_*` 常量即可。
///
/// ```rust
/// use roomba_protocol::Opcode;
///
/// assert_eq!(Opcode::try_from(137u8).unwrap(), Opcode::Drive);
/// assert!(Opcode::try_from(0u8).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    Safe = 131,
    Full = 132,
    Power = 133,
    Spot = 134,
    Clean = 135,
    Max = 136,
    Drive = 137,
    Motors = 138,
    Leds = 139,
    Song = 140,
    Play = 141,
    Sensors = 142,
    Dock = 143,
    MotorsPwm = 144,
    DrivePwm = 146,
    Stream = 148,
}

impl Opcode {
    /// 是否为模式切换指令（发送时需要补一个 0 字节）
    pub fn is_mode_toggle(self) -> bool {
        matches!(
            self,
            Opcode::Safe
                | Opcode::Full
                | Opcode::Power
                | Opcode::Spot
                | Opcode::Clean
                | Opcode::Max
                | Opcode::Dock
        )
    }
}
