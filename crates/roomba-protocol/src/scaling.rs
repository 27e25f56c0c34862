//! 归一化输入到设备量程的映射
//!
//! 上层（摇杆、键盘、脚本）统一使用归一化浮点值（通常是 [-1, 1]），
//! 本模块负责把它们映射为设备原生的整数量程。
//!
//! - [`LinearScale`]: 连续线性插值，越界输入被钳位到定义域
//! - [`QuantizedScale`]: 把定义域等分为 N 段，每段对应一个离散档位
//!
//! 两种映射都是纯函数。非有限输入（NaN / ±∞）由 [`ensure_finite`] 在指令构建时拒绝。
//!
//! ```rust
//! use roomba_protocol::scaling::{DRIVE_PWM_SCALE, DRIVE_VELOCITY_SCALE};
//!
//! assert_eq!(DRIVE_VELOCITY_SCALE.to_i16(1.0), 50);
//! assert_eq!(DRIVE_VELOCITY_SCALE.to_i16(-3.0), -50); // 钳位
//! assert_eq!(DRIVE_PWM_SCALE.quantize(0.0), 0);
//! assert_eq!(DRIVE_PWM_SCALE.quantize(1.0), 127);
//! ```

use crate::ProtocolError;
use crate::constants::{DRIVE_PWM_LEVELS, DRIVE_RADIUS_LIMIT, DRIVE_VELOCITY_LIMIT, MOTOR_PWM_MAX};

/// 线性映射（带钳位）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    /// 创建线性映射
    ///
    /// `domain` 的两端可以反向（例如把摇杆的 0..255 映射为 1..-1），但不能重合。
    ///
    /// # Panics
    ///
    /// 定义域两端相等或含 NaN 时 panic（用于 `const` 时是编译错误）。
    pub const fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        assert!(
            domain.0 < domain.1 || domain.0 > domain.1,
            "LinearScale domain must not be degenerate"
        );
        Self { domain, range }
    }

    /// 定义域
    pub const fn domain(&self) -> (f64, f64) {
        self.domain
    }

    /// 值域
    pub const fn range(&self) -> (f64, f64) {
        self.range
    }

    /// 映射为连续值
    ///
    /// 输入先钳位到定义域，因此输出永远不会超出值域。
    pub fn apply(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let (lo, hi) = if d0 <= d1 { (d0, d1) } else { (d1, d0) };
        let t = (value.clamp(lo, hi) - d0) / (d1 - d0);
        r0 + t * (r1 - r0)
    }

    /// 映射并四舍五入为 i16
    pub fn to_i16(&self, value: f64) -> i16 {
        // apply() 已钳位，值域在 i16 内时 `as` 不会饱和
        self.apply(value).round() as i16
    }
}

/// 量化映射（离散档位）
///
/// 把定义域等分为 `levels.len()` 段，第 i 段映射到 `levels[i]`。
/// 落在段边界上的值归入上一段（更靠近值域末端的档位）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizedScale {
    domain: (f64, f64),
    levels: &'static [i16],
}

impl QuantizedScale {
    /// 创建量化映射
    ///
    /// `levels` 必须非空且有序，定义域必须递增。
    ///
    /// # Panics
    ///
    /// `levels` 为空或 `domain.0 >= domain.1` 时 panic（用于 `const` 时是编译错误）。
    pub const fn new(domain: (f64, f64), levels: &'static [i16]) -> Self {
        assert!(!levels.is_empty(), "QuantizedScale needs at least one level");
        assert!(domain.0 < domain.1, "QuantizedScale domain must be increasing");
        Self { domain, levels }
    }

    /// 离散档位表
    pub const fn levels(&self) -> &'static [i16] {
        self.levels
    }

    /// 映射到最近的档位
    pub fn quantize(&self, value: f64) -> i16 {
        let (d0, d1) = self.domain;
        let n = self.levels.len();
        let t = (value.clamp(d0, d1) - d0) / (d1 - d0);
        let index = ((t * n as f64).floor() as usize).min(n - 1);
        self.levels[index]
    }
}

/// 直接驱动速度：[-1, 1] → [-50, 50]
pub const DRIVE_VELOCITY_SCALE: LinearScale = LinearScale::new(
    (-1.0, 1.0),
    (-(DRIVE_VELOCITY_LIMIT as f64), DRIVE_VELOCITY_LIMIT as f64),
);

/// 转弯半径：[-1, 1] → [-2000, 2000]
pub const DRIVE_RADIUS_SCALE: LinearScale = LinearScale::new(
    (-1.0, 1.0),
    (-(DRIVE_RADIUS_LIMIT as f64), DRIVE_RADIUS_LIMIT as f64),
);

/// 主刷/边刷 PWM：[-1, 1] → [-127, 127]
pub const BRUSH_PWM_SCALE: LinearScale =
    LinearScale::new((-1.0, 1.0), (-(MOTOR_PWM_MAX as f64), MOTOR_PWM_MAX as f64));

/// 吸尘电机 PWM：[0, 1] → [0, 127]
pub const VACUUM_PWM_SCALE: LinearScale = LinearScale::new((0.0, 1.0), (0.0, MOTOR_PWM_MAX as f64));

/// 驱动轮 PWM：[-1, 1] → 离散档位
pub const DRIVE_PWM_SCALE: QuantizedScale = QuantizedScale::new((-1.0, 1.0), &DRIVE_PWM_LEVELS);

/// 摇杆原始字节：[0, 255] → [1, -1]（摇杆向上推为 0）
pub const ANALOG_AXIS_SCALE: LinearScale = LinearScale::new((0.0, 255.0), (1.0, -1.0));

/// 把摇杆原始字节转换为归一化值
pub fn axis_from_byte(raw: u8) -> f64 {
    ANALOG_AXIS_SCALE.apply(raw as f64)
}

/// 校验输入为有限值
///
/// NaN 与无穷大无法钳位到有意义的档位，直接拒绝。
pub fn ensure_finite(field: &'static str, value: f64) -> Result<f64, ProtocolError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ProtocolError::NonFinite { field, value })
    }
}
