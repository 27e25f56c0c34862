//! 控制指令结构体定义
//!
//! 每种设备操作对应一个结构体，通过 `to_command()` 构建最终的字节序列。
//! 浮点参数均为归一化值，映射规则见 [`crate::scaling`]。
//!
//! 模块末尾提供与结构体一一对应的便捷函数（`drive()`、`motors_pwm()` 等）。

use crate::constants::*;
use crate::ids::*;
use crate::scaling::{
    BRUSH_PWM_SCALE, DRIVE_PWM_SCALE, DRIVE_RADIUS_SCALE, DRIVE_VELOCITY_SCALE, VACUUM_PWM_SCALE,
    ensure_finite,
};
use crate::{Command, CommandBytes, ProtocolError, i16_to_bytes_be};

// ============================================================================
// 模式切换
// ============================================================================

/// 模式切换指令
///
/// 发送格式：`[opcode, 0]`，协议要求在这些指令后补一个 0 字节。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeCommand {
    /// 安全模式（保留悬崖/轮落保护）
    Safe,
    /// 完全控制模式
    Full,
    /// 关机
    Power,
    /// 定点清扫
    Spot,
    /// 常规清扫
    Clean,
    /// 强力清扫
    Max,
    /// 回充座
    Dock,
}

impl ModeCommand {
    /// 全部模式（用于 CLI 解析和测试）
    pub const ALL: [ModeCommand; 7] = [
        ModeCommand::Safe,
        ModeCommand::Full,
        ModeCommand::Power,
        ModeCommand::Spot,
        ModeCommand::Clean,
        ModeCommand::Max,
        ModeCommand::Dock,
    ];

    /// 对应的 opcode
    pub const fn opcode(self) -> u8 {
        match self {
            ModeCommand::Safe => OPCODE_SAFE,
            ModeCommand::Full => OPCODE_FULL,
            ModeCommand::Power => OPCODE_POWER,
            ModeCommand::Spot => OPCODE_SPOT,
            ModeCommand::Clean => OPCODE_CLEAN,
            ModeCommand::Max => OPCODE_MAX,
            ModeCommand::Dock => OPCODE_DOCK,
        }
    }

    /// 小写名称（日志与 CLI 使用）
    pub const fn name(self) -> &'static str {
        match self {
            ModeCommand::Safe => "safe",
            ModeCommand::Full => "full",
            ModeCommand::Power => "power",
            ModeCommand::Spot => "spot",
            ModeCommand::Clean => "clean",
            ModeCommand::Max => "max",
            ModeCommand::Dock => "dock",
        }
    }

    pub fn to_command(self) -> Command {
        Command::new(self.opcode(), &[0])
    }
}

impl std::str::FromStr for ModeCommand {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModeCommand::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ProtocolError::InvalidValue {
                field: format!("ModeCommand({s})"),
                value: 0,
            })
    }
}

// ============================================================================
// 驱动轮
// ============================================================================

/// 直接驱动指令 (137)
///
/// 发送格式：`[137, radius_hi, radius_lo, velocity_hi, velocity_lo, 0]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveCommand {
    /// 归一化速度 [-1, 1] → [-50, 50]
    pub velocity: f64,
    /// 归一化转弯半径 [-1, 1] → [-2000, 2000]
    pub radius: f64,
}

impl DriveCommand {
    pub fn new(velocity: f64, radius: f64) -> Self {
        Self { velocity, radius }
    }

    pub fn to_command(&self) -> Result<Command, ProtocolError> {
        let velocity = DRIVE_VELOCITY_SCALE.to_i16(ensure_finite("velocity", self.velocity)?);
        let radius = DRIVE_RADIUS_SCALE.to_i16(ensure_finite("radius", self.radius)?);
        Ok(encode_drive(velocity, radius))
    }

    /// 直行（使用设备的特殊半径 0x8000）
    pub fn straight(velocity: f64) -> Result<Command, ProtocolError> {
        let velocity = DRIVE_VELOCITY_SCALE.to_i16(ensure_finite("velocity", velocity)?);
        Ok(encode_drive(velocity, DRIVE_RADIUS_STRAIGHT))
    }
}

fn encode_drive(velocity: i16, radius: i16) -> Command {
    let [radius_hi, radius_lo] = i16_to_bytes_be(radius);
    let [velocity_hi, velocity_lo] = i16_to_bytes_be(velocity);
    Command::new(
        OPCODE_DRIVE,
        &[radius_hi, radius_lo, velocity_hi, velocity_lo, 0],
    )
}

/// 驱动轮 PWM 指令 (146)
///
/// 每个轮子的值经过量化映射（[`crate::constants::DRIVE_PWM_LEVELS`]）。
/// 发送格式：`[146, right_hi, right_lo, left_hi, left_lo]`（右轮在前）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrivePwmCommand {
    pub left: f64,
    pub right: f64,
}

impl DrivePwmCommand {
    pub fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    pub fn to_command(&self) -> Result<Command, ProtocolError> {
        let left = DRIVE_PWM_SCALE.quantize(ensure_finite("left", self.left)?);
        let right = DRIVE_PWM_SCALE.quantize(ensure_finite("right", self.right)?);
        let [right_hi, right_lo] = i16_to_bytes_be(right);
        let [left_hi, left_lo] = i16_to_bytes_be(left);
        Ok(Command::new(
            OPCODE_DRIVE_PWM,
            &[right_hi, right_lo, left_hi, left_lo],
        ))
    }
}

// ============================================================================
// 清扫电机
// ============================================================================

/// 清扫电机 PWM 指令 (144)
///
/// 字段为设备量程的整数值（已钳位）。
/// 发送格式：`[144, main_brush, side_brush, vacuum, 0]`，负值按二进制补码写入单字节。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotorsPwmCommand {
    /// 主刷 -127..=127
    pub main_brush: i8,
    /// 边刷 -127..=127
    pub side_brush: i8,
    /// 吸尘 0..=127
    pub vacuum: u8,
}

impl MotorsPwmCommand {
    /// 由设备整数值创建（越界值被钳位）
    pub fn new(main_brush: i16, side_brush: i16, vacuum: i16) -> Self {
        Self {
            main_brush: main_brush.clamp(-MOTOR_PWM_MAX, MOTOR_PWM_MAX) as i8,
            side_brush: side_brush.clamp(-MOTOR_PWM_MAX, MOTOR_PWM_MAX) as i8,
            vacuum: vacuum.clamp(0, MOTOR_PWM_MAX) as u8,
        }
    }

    /// 由归一化值创建
    ///
    /// - `main_brush` / `side_brush`: [-1, 1] → [-127, 127]
    /// - `vacuum`: [0, 1] → [0, 127]
    pub fn from_normalized(
        main_brush: f64,
        side_brush: f64,
        vacuum: f64,
    ) -> Result<Self, ProtocolError> {
        Ok(Self::new(
            BRUSH_PWM_SCALE.to_i16(ensure_finite("main_brush", main_brush)?),
            BRUSH_PWM_SCALE.to_i16(ensure_finite("side_brush", side_brush)?),
            VACUUM_PWM_SCALE.to_i16(ensure_finite("vacuum", vacuum)?),
        ))
    }

    pub fn to_command(&self) -> Command {
        Command::new(
            OPCODE_MOTORS_PWM,
            &[
                self.main_brush as u8,
                self.side_brush as u8,
                self.vacuum,
                0,
            ],
        )
    }
}

/// 清扫电机开关指令 (138)
///
/// `mask` 由 `SIDE_BRUSH_ON` / `VACUUM_ON` / `MAIN_BRUSH_ON` 组合。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotorsCommand {
    pub mask: u8,
}

impl MotorsCommand {
    pub fn new(mask: u8) -> Self {
        Self { mask }
    }

    pub fn to_command(&self) -> Command {
        Command::new(OPCODE_MOTORS, &[self.mask])
    }
}

// ============================================================================
// LED 与歌曲
// ============================================================================

/// LED 指令 (139)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedsCommand {
    /// LED 位（`LED_*_ON` 组合）
    pub bits: u8,
    /// 电源灯颜色 0 = 绿 .. 255 = 红
    pub color: u8,
    /// 电源灯亮度
    pub intensity: u8,
}

impl LedsCommand {
    pub fn new(bits: u8, color: u8, intensity: u8) -> Self {
        Self {
            bits,
            color,
            intensity,
        }
    }

    pub fn to_command(&self) -> Command {
        let params: [u8; LEDS_NUM_PARAMETERS] = [self.bits, self.color, self.intensity];
        Command::new(OPCODE_LEDS, &params)
    }
}

/// 单个音符（MIDI 音高, 时值 1/64 秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub pitch: u8,
    pub duration: u8,
}

impl Note {
    pub const fn new(pitch: u8, duration: u8) -> Self {
        Self { pitch, duration }
    }
}

/// 定义歌曲指令 (140)
///
/// 发送格式：`[140, number, len, pitch_1, duration_1, ...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongCommand {
    pub number: u8,
    pub notes: Vec<Note>,
}

impl SongCommand {
    pub fn new(number: u8, notes: impl Into<Vec<Note>>) -> Self {
        Self {
            number,
            notes: notes.into(),
        }
    }

    pub fn to_command(&self) -> Result<Command, ProtocolError> {
        if self.notes.len() > SONG_MAX_NOTES {
            return Err(ProtocolError::TooMany {
                field: "notes",
                max: SONG_MAX_NOTES,
                actual: self.notes.len(),
            });
        }
        let mut params = CommandBytes::with_capacity(2 + self.notes.len() * 2);
        params.push(self.number);
        params.push(self.notes.len() as u8);
        for note in &self.notes {
            params.push(note.pitch);
            params.push(note.duration);
        }
        Ok(Command::new(OPCODE_SONG, &params))
    }
}

/// 播放歌曲指令 (141)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayCommand {
    pub number: u8,
}

impl PlayCommand {
    pub fn to_command(&self) -> Command {
        Command::new(OPCODE_PLAY, &[self.number])
    }
}

// ============================================================================
// 传感器
// ============================================================================

/// 传感器请求指令 (142)
///
/// 发送格式：`[142, packet_id]`，`packet_id = 0` 请求完整的 26 字节包。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorsCommand {
    pub packet_id: u8,
}

impl SensorsCommand {
    pub fn new(packet_id: u8) -> Self {
        Self { packet_id }
    }

    pub fn to_command(&self) -> Command {
        Command::new(OPCODE_SENSORS, &[self.packet_id])
    }
}

/// 传感器流指令 (148)
///
/// 发送格式：`[148, count, packet_1, ...]`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamCommand {
    pub packets: Vec<u8>,
}

impl StreamCommand {
    pub fn new(packets: impl Into<Vec<u8>>) -> Self {
        Self {
            packets: packets.into(),
        }
    }

    pub fn to_command(&self) -> Result<Command, ProtocolError> {
        if self.packets.len() > u8::MAX as usize {
            return Err(ProtocolError::TooMany {
                field: "packets",
                max: u8::MAX as usize,
                actual: self.packets.len(),
            });
        }
        let mut params = CommandBytes::with_capacity(1 + self.packets.len());
        params.push(self.packets.len() as u8);
        params.extend_from_slice(&self.packets);
        Ok(Command::new(OPCODE_STREAM, &params))
    }

    /// 开启虚拟墙传感器流（`[148, 1, 13, 0]`）
    ///
    /// 桥接模块要求在流指令后补一个 0 字节。
    pub fn virtual_wall() -> Command {
        Command::new(OPCODE_STREAM, &[1, VIRTUAL_WALL_PACKET, 0])
    }
}

// ============================================================================
// 便捷函数
// ============================================================================

/// 模式切换：`[opcode, 0]`
pub fn mode_toggle(mode: ModeCommand) -> Command {
    mode.to_command()
}

/// 直接驱动
pub fn drive(velocity: f64, radius: f64) -> Result<Command, ProtocolError> {
    DriveCommand::new(velocity, radius).to_command()
}

/// 驱动轮 PWM
pub fn drive_pwm(left: f64, right: f64) -> Result<Command, ProtocolError> {
    DrivePwmCommand::new(left, right).to_command()
}

/// 清扫电机 PWM（归一化输入）
pub fn motors_pwm(main_brush: f64, side_brush: f64, vacuum: f64) -> Result<Command, ProtocolError> {
    Ok(MotorsPwmCommand::from_normalized(main_brush, side_brush, vacuum)?.to_command())
}

/// 请求传感器包
pub fn request_sensors(packet_id: u8) -> Command {
    SensorsCommand::new(packet_id).to_command()
}
