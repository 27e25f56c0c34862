//! # Roomba Protocol
//!
//! Roomba SCI（Serial Control Interface）字节协议定义（无 IO 依赖）
//!
//! ## 模块
//!
//! - `ids`: 指令 opcode 与传感器包 ID 常量
//! - `constants`: 协议常量（LED/电机掩码、音符时值、电机量程）
//! - `scaling`: 归一化输入到设备整数量程的映射（线性/量化）
//! - `control`: 指令字节序列构建
//! - `feedback`: 遥测帧解析
//!
//! ## 字节序
//!
//! 协议中所有 16 位参数使用大端字节序（高字节在前），负数使用二进制补码。

pub mod constants;
pub mod control;
pub mod feedback;
pub mod ids;
pub mod scaling;

// 重新导出常用类型
pub use constants::*;
pub use control::*;
pub use feedback::*;
pub use ids::*;
pub use scaling::*;

use smallvec::SmallVec;

/// 指令字节缓冲区
///
/// 栈上预留 8 字节，足以覆盖除 `song` / `stream` 外的所有指令，
/// 这两个较长的指令会退化为堆分配。
pub type CommandBytes = SmallVec<[u8; 8]>;

/// SCI 指令（opcode + 参数字节）
///
/// # 在架构中的位置
///
/// ```text
/// Protocol Layer (roomba-protocol)
///     ↓ control::* 构建
/// Command (此类型)
///     ↓ as_bytes() 写入
/// Transport Layer (roomba-transport)
///     ↓ TCP 桥接
/// Device
/// ```
///
/// 构建后不可变，由一次写操作消费。
///
/// ```rust
/// use roomba_protocol::{Command, OPCODE_SAFE};
///
/// let cmd = Command::new(OPCODE_SAFE, &[0]);
/// assert_eq!(cmd.opcode(), 131);
/// assert_eq!(cmd.as_bytes(), &[131, 0]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    bytes: CommandBytes,
}

impl Command {
    /// 由 opcode 和参数字节创建指令
    pub fn new(opcode: u8, params: &[u8]) -> Self {
        let mut bytes = CommandBytes::with_capacity(params.len() + 1);
        bytes.push(opcode);
        bytes.extend_from_slice(params);
        Self { bytes }
    }

    /// 获取 opcode
    pub fn opcode(&self) -> u8 {
        self.bytes[0]
    }

    /// 获取参数字节（不含 opcode）
    pub fn params(&self) -> &[u8] {
        &self.bytes[1..]
    }

    /// 获取完整字节序列（用于写入）
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 总字节数
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// 指令至少包含 opcode，永远不为空
    pub fn is_empty(&self) -> bool {
        false
    }

    /// 消费并获取字节序列
    pub fn into_bytes(self) -> CommandBytes {
        self.bytes
    }
}

impl AsRef<[u8]> for Command {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

use thiserror::Error;

/// 协议编解码错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Non-finite input for {field}: {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: u8 },

    #[error("Too many items for {field}: max {max}, got {actual}")]
    TooMany {
        field: &'static str,
        max: usize,
        actual: usize,
    },
}

/// 大端字节序转 i16
pub fn bytes_to_i16_be(bytes: [u8; 2]) -> i16 {
    i16::from_be_bytes(bytes)
}

/// i16 转大端字节序（二进制补码）
///
/// 设备的所有 16 位有符号参数（速度、半径、PWM）都用这个编码。
pub fn i16_to_bytes_be(value: i16) -> [u8; 2] {
    value.to_be_bytes()
}

/// 由高/低字节合成无符号 16 位值（`msb * 256 + lsb`）
pub fn word_from_bytes(msb: u8, lsb: u8) -> u16 {
    u16::from_be_bytes([msb, lsb])
}
