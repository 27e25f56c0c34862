//! 协议常量定义
//!
//! 集中定义 LED/电机位掩码、音符时值和电机量程，避免在代码中散落"魔法数"。

// ============================================================================
// LED 控制掩码（`leds` 指令第 1 个参数字节）
// ============================================================================

pub const LED_DIRT_ON: u8 = 0x01;
pub const LED_DIRT_OFF: u8 = 0xFE;
pub const LED_MAX_ON: u8 = 0x02;
pub const LED_MAX_OFF: u8 = 0xFD;
pub const LED_CLEAN_ON: u8 = 0x04;
pub const LED_CLEAN_OFF: u8 = 0xFB;
pub const LED_SPOT_ON: u8 = 0x08;
pub const LED_SPOT_OFF: u8 = 0xF7;

/// 状态灯颜色（高 2 位）
pub const LED_STATUS_OFF: u8 = 0x0F;
pub const LED_STATUS_RED: u8 = 0x10;
pub const LED_STATUS_GREEN: u8 = 0x20;
pub const LED_STATUS_AMBER: u8 = 0x30;

/// `leds` 指令的参数个数
pub const LEDS_NUM_PARAMETERS: usize = 3;

// ============================================================================
// 清扫电机开关掩码（`motors` 指令）
// ============================================================================

pub const SIDE_BRUSH_ON: u8 = 0x01;
pub const SIDE_BRUSH_OFF: u8 = 0xFE;
pub const VACUUM_ON: u8 = 0x02;
pub const VACUUM_OFF: u8 = 0xFD;
pub const MAIN_BRUSH_ON: u8 = 0x04;
pub const MAIN_BRUSH_OFF: u8 = 0xFB;
pub const ALL_CLEANING_MOTORS_ON: u8 = 0xFF;
pub const ALL_CLEANING_MOTORS_OFF: u8 = 0x00;

// ============================================================================
// 歌曲
// ============================================================================

/// 十六分音符时值（单位 1/64 秒）
pub const NOTE_DURATION_SIXTEENTH_NOTE: u8 = 16;
/// 八分音符时值
pub const NOTE_DURATION_EIGHTH_NOTE: u8 = 32;
/// 四分音符时值
pub const NOTE_DURATION_QUARTER_NOTE: u8 = 64;

/// 单首歌曲最多音符数
pub const SONG_MAX_NOTES: usize = 16;

// ============================================================================
// 量程
// ============================================================================

/// 直接驱动速度量程（设备单位）
pub const DRIVE_VELOCITY_LIMIT: i16 = 50;
/// 转弯半径量程（mm）
pub const DRIVE_RADIUS_LIMIT: i16 = 2000;
/// 特殊半径：直行
pub const DRIVE_RADIUS_STRAIGHT: i16 = i16::MIN;

/// 清扫电机 PWM 最大值（刷子为 ±127，吸尘为 0..=127）
pub const MOTOR_PWM_MAX: i16 = 127;

/// 驱动轮 PWM 离散档位（有序）
pub const DRIVE_PWM_LEVELS: [i16; 9] = [-127, -64, -32, -16, 0, 16, 32, 64, 127];
