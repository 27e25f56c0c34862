//! 遥测帧解析
//!
//! 设备对 `[142, 0]` 的响应是一个固定 26 字节的传感器包，按位置寻址。
//! 每个位置对应 [`FIELD_TABLE`] 中的一个字段定义。
//!
//! 解析是全有或全无的：长度不等于 26 的帧直接返回
//! [`ProtocolError::InvalidLength`]，不会产生部分结果。
//!
//! 高/低字节成对的字段（`distance_msb` / `distance_lsb` 等）保持拆分，
//! 需要合成时显式调用 [`Telemetry::word`]。

use crate::{ProtocolError, word_from_bytes};
use std::collections::BTreeMap;
use std::fmt;

/// 字段解码方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 非零为 true
    Boolean,
    /// 大端无符号整数
    UnsignedInteger,
    /// 原始字节按文本解码（非法 UTF-8 被替换）
    RawText,
}

/// 单个字段定义
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    /// 字段字节宽度
    pub width: usize,
}

impl FieldDef {
    const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            width: 1,
        }
    }
}

use FieldKind::{Boolean, RawText, UnsignedInteger};

/// 完整传感器包（packet 0）的字段表，按字节偏移排列
pub const FIELD_TABLE: [FieldDef; 26] = [
    FieldDef::new("bumps_wheel_drops", UnsignedInteger),
    FieldDef::new("wall", Boolean),
    FieldDef::new("cliff_left", Boolean),
    FieldDef::new("cliff_front_left", Boolean),
    FieldDef::new("cliff_front_right", Boolean),
    FieldDef::new("cliff_right", Boolean),
    FieldDef::new("virtual_wall", Boolean),
    FieldDef::new("motor_overcurrents", RawText),
    FieldDef::new("dirt_detector_left", RawText),
    FieldDef::new("dirt_detector_right", RawText),
    FieldDef::new("remote_opcode", RawText),
    FieldDef::new("buttons", RawText),
    FieldDef::new("distance_msb", UnsignedInteger),
    FieldDef::new("distance_lsb", UnsignedInteger),
    FieldDef::new("angle_msb", UnsignedInteger),
    FieldDef::new("angle_lsb", UnsignedInteger),
    FieldDef::new("charging_state", UnsignedInteger),
    FieldDef::new("voltage_msb", UnsignedInteger),
    FieldDef::new("voltage_lsb", UnsignedInteger),
    FieldDef::new("current_msb", UnsignedInteger),
    FieldDef::new("current_lsb", UnsignedInteger),
    FieldDef::new("temperature", UnsignedInteger),
    FieldDef::new("charge_msb", UnsignedInteger),
    FieldDef::new("charge_lsb", UnsignedInteger),
    FieldDef::new("capacity_msb", UnsignedInteger),
    FieldDef::new("capacity_lsb", UnsignedInteger),
];

/// 完整传感器包长度
pub const TELEMETRY_FRAME_LEN: usize = 26;

/// 解码后的字段值
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum TelemetryValue {
    Bool(bool),
    UInt(u32),
    Text(String),
}

impl TelemetryValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TelemetryValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u32> {
        match self {
            TelemetryValue::UInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TelemetryValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for TelemetryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryValue::Bool(v) => write!(f, "{v}"),
            TelemetryValue::UInt(v) => write!(f, "{v}"),
            TelemetryValue::Text(v) => write!(f, "{v:?}"),
        }
    }
}

/// 充电状态（`charging_state` 字段）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ChargingState {
    NotCharging = 0,
    ChargingRecovery = 1,
    Charging = 2,
    TrickleCharging = 3,
    Waiting = 4,
    ChargingError = 5,
}

impl TryFrom<u8> for ChargingState {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ChargingState::NotCharging),
            1 => Ok(ChargingState::ChargingRecovery),
            2 => Ok(ChargingState::Charging),
            3 => Ok(ChargingState::TrickleCharging),
            4 => Ok(ChargingState::Waiting),
            5 => Ok(ChargingState::ChargingError),
            _ => Err(ProtocolError::InvalidValue {
                field: "ChargingState".to_string(),
                value,
            }),
        }
    }
}

/// 一帧遥测数据（字段名 → 值）
///
/// 由 [`decode_telemetry`] 整体构建，之后不可变；
/// 上层以整体替换的方式发布新帧。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Telemetry {
    fields: BTreeMap<&'static str, TelemetryValue>,
}

impl Telemetry {
    /// 按字段名查询
    pub fn get(&self, name: &str) -> Option<&TelemetryValue> {
        self.fields.get(name)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(TelemetryValue::as_bool)
    }

    pub fn get_uint(&self, name: &str) -> Option<u32> {
        self.get(name).and_then(TelemetryValue::as_uint)
    }

    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(TelemetryValue::as_text)
    }

    /// 合成高/低字节字段：`msb * 256 + lsb`
    ///
    /// ```rust
    /// use roomba_protocol::decode_telemetry;
    ///
    /// let mut frame = [0u8; 26];
    /// frame[17] = 0x3A; // voltage_msb
    /// frame[18] = 0x98; // voltage_lsb
    /// let telemetry = decode_telemetry(&frame).unwrap();
    /// assert_eq!(telemetry.word("voltage_msb", "voltage_lsb"), Some(15000));
    /// ```
    pub fn word(&self, msb: &str, lsb: &str) -> Option<u16> {
        let hi = u8::try_from(self.get_uint(msb)?).ok()?;
        let lo = u8::try_from(self.get_uint(lsb)?).ok()?;
        Some(word_from_bytes(hi, lo))
    }

    /// 解析充电状态，值未知时返回 `None`
    pub fn charging_state(&self) -> Option<ChargingState> {
        let raw = u8::try_from(self.get_uint("charging_state")?).ok()?;
        ChargingState::try_from(raw).ok()
    }

    /// 按字段名排序迭代
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &TelemetryValue)> {
        self.fields.iter().map(|(name, value)| (*name, value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// 解析一帧完整传感器包
///
/// # 错误
///
/// 长度不等于 [`TELEMETRY_FRAME_LEN`] 时返回 [`ProtocolError::InvalidLength`]。
pub fn decode_telemetry(frame: &[u8]) -> Result<Telemetry, ProtocolError> {
    if frame.len() != TELEMETRY_FRAME_LEN {
        return Err(ProtocolError::InvalidLength {
            expected: TELEMETRY_FRAME_LEN,
            actual: frame.len(),
        });
    }

    let mut fields = BTreeMap::new();
    let mut offset = 0;
    for def in &FIELD_TABLE {
        let bytes = &frame[offset..offset + def.width];
        let value = match def.kind {
            FieldKind::Boolean => TelemetryValue::Bool(bytes.iter().any(|b| *b != 0)),
            FieldKind::UnsignedInteger => TelemetryValue::UInt(
                bytes.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b)),
            ),
            FieldKind::RawText => TelemetryValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        };
        fields.insert(def.name, value);
        offset += def.width;
    }

    Ok(Telemetry { fields })
}
