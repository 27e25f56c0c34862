//! 清扫电机指令合并
//!
//! 三个电机共用一条 `motors_pwm` 指令。每次设置都立即更新寄存器，
//! 并重新安排一个尾沿去抖定时器；定时器到期时只发出一条包含最终状态的指令。

use roomba_protocol::{
    BRUSH_PWM_SCALE, Command, MOTOR_PWM_MAX, MotorsPwmCommand, ProtocolError, VACUUM_PWM_SCALE,
    ensure_finite,
};
use std::time::{Duration, Instant};

/// 三个电机的当前设定值（设备量程）
pub type MotorState = MotorsPwmCommand;

/// 默认去抖时间
pub const DEFAULT_MOTOR_DEBOUNCE: Duration = Duration::from_millis(5);

/// 清扫电机
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Motor {
    MainBrush,
    SideBrush,
    Vacuum,
}

impl Motor {
    pub const fn name(self) -> &'static str {
        match self {
            Motor::MainBrush => "main_brush",
            Motor::SideBrush => "side_brush",
            Motor::Vacuum => "vacuum",
        }
    }
}

/// 电机寄存器 + 去抖定时器
#[derive(Debug, Clone)]
pub struct MotorCoalescer {
    state: MotorState,
    debounce: Duration,
    deadline: Option<Instant>,
}

impl MotorCoalescer {
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: MotorState::default(),
            debounce,
            deadline: None,
        }
    }

    pub fn state(&self) -> MotorState {
        self.state
    }

    /// 定时器到期时间（无待发送状态时为 `None`）
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    fn level(&self, motor: Motor) -> i16 {
        match motor {
            Motor::MainBrush => self.state.main_brush as i16,
            Motor::SideBrush => self.state.side_brush as i16,
            Motor::Vacuum => self.state.vacuum as i16,
        }
    }

    fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.debounce);
    }

    /// 设置电机（归一化值）
    ///
    /// 刷子 [-1, 1]，吸尘 [0, 1]，越界钳位。
    pub fn set(&mut self, motor: Motor, value: f64, now: Instant) -> Result<(), ProtocolError> {
        let value = ensure_finite(motor.name(), value)?;
        let level = match motor {
            Motor::MainBrush | Motor::SideBrush => BRUSH_PWM_SCALE.to_i16(value),
            Motor::Vacuum => VACUUM_PWM_SCALE.to_i16(value),
        };
        self.set_level(motor, level, now);
        Ok(())
    }

    /// 设置电机（设备量程整数值，越界钳位）
    pub fn set_level(&mut self, motor: Motor, level: i16, now: Instant) {
        let current = self.state;
        self.state = match motor {
            Motor::MainBrush => {
                MotorState::new(level, current.side_brush as i16, current.vacuum as i16)
            },
            Motor::SideBrush => {
                MotorState::new(current.main_brush as i16, level, current.vacuum as i16)
            },
            Motor::Vacuum => {
                MotorState::new(current.main_brush as i16, current.side_brush as i16, level)
            },
        };
        self.arm(now);
    }

    /// 在 0 和最大值之间切换
    pub fn toggle(&mut self, motor: Motor, now: Instant) {
        let level = if self.level(motor) != 0 { 0 } else { MOTOR_PWM_MAX };
        self.set_level(motor, level, now);
    }

    /// 定时器到期时返回合并后的指令
    pub fn poll(&mut self, now: Instant) -> Option<Command> {
        match self.deadline {
            Some(deadline) if now >= deadline => self.flush(),
            _ => None,
        }
    }

    /// 立即取出待发送的指令（无待发送状态时返回 `None`）
    pub fn flush(&mut self) -> Option<Command> {
        self.deadline.take().map(|_| self.state.to_command())
    }

    /// 清零寄存器并取消定时器（会话结束时调用）
    pub fn reset(&mut self) {
        self.state = MotorState::default();
        self.deadline = None;
    }
}

impl Default for MotorCoalescer {
    fn default() -> Self {
        Self::new(DEFAULT_MOTOR_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_rapid_setters_emit_one_command() {
        let mut coalescer = MotorCoalescer::default();
        let t0 = Instant::now();

        coalescer.set(Motor::MainBrush, 1.0, t0).unwrap();
        coalescer.set(Motor::SideBrush, -1.0, t0 + MS).unwrap();
        coalescer.set(Motor::Vacuum, 1.0, t0 + MS * 2).unwrap();

        // 每次设置都重新计时
        assert!(coalescer.poll(t0 + MS * 5).is_none());
        assert!(coalescer.poll(t0 + MS * 6).is_none());

        let cmd = coalescer.poll(t0 + MS * 7).unwrap();
        assert_eq!(cmd.as_bytes(), &[144, 127, 0x81, 127, 0]);
        assert!(coalescer.poll(t0 + MS * 100).is_none());
    }

    #[test]
    fn test_state_persists_between_commands() {
        let mut coalescer = MotorCoalescer::default();
        let t0 = Instant::now();
        coalescer.set(Motor::Vacuum, 0.5, t0).unwrap();
        coalescer.flush().unwrap();

        coalescer.set(Motor::MainBrush, -0.5, t0 + MS * 10).unwrap();
        let cmd = coalescer.flush().unwrap();
        assert_eq!(cmd.as_bytes(), &[144, (-64i8) as u8, 0, 64, 0]);
    }

    #[test]
    fn test_toggle() {
        let mut coalescer = MotorCoalescer::default();
        let t0 = Instant::now();

        coalescer.toggle(Motor::SideBrush, t0);
        assert_eq!(coalescer.state().side_brush, 127);
        coalescer.toggle(Motor::SideBrush, t0);
        assert_eq!(coalescer.state().side_brush, 0);

        // 反转中的刷子切换为停止
        coalescer.set(Motor::MainBrush, -1.0, t0).unwrap();
        coalescer.toggle(Motor::MainBrush, t0);
        assert_eq!(coalescer.state().main_brush, 0);

        coalescer.toggle(Motor::Vacuum, t0);
        assert_eq!(coalescer.state().vacuum, 127);
    }

    #[test]
    fn test_clamping() {
        let mut coalescer = MotorCoalescer::default();
        let t0 = Instant::now();
        coalescer.set(Motor::Vacuum, -1.0, t0).unwrap();
        assert_eq!(coalescer.state().vacuum, 0);
        coalescer.set(Motor::MainBrush, 4.0, t0).unwrap();
        assert_eq!(coalescer.state().main_brush, 127);
        coalescer.set_level(Motor::SideBrush, -1000, t0);
        assert_eq!(coalescer.state().side_brush, -127);
    }

    #[test]
    fn test_non_finite_rejected_without_arming() {
        let mut coalescer = MotorCoalescer::default();
        let err = coalescer.set(Motor::MainBrush, f64::NAN, Instant::now());
        assert!(matches!(
            err,
            Err(ProtocolError::NonFinite { field: "main_brush", .. })
        ));
        assert!(!coalescer.is_pending());
    }

    #[test]
    fn test_flush_and_reset() {
        let mut coalescer = MotorCoalescer::new(Duration::from_millis(50));
        assert!(coalescer.flush().is_none());

        let t0 = Instant::now();
        coalescer.toggle(Motor::MainBrush, t0);
        assert_eq!(coalescer.deadline(), Some(t0 + Duration::from_millis(50)));
        assert!(coalescer.flush().is_some());
        assert!(!coalescer.is_pending());

        coalescer.toggle(Motor::Vacuum, t0);
        coalescer.reset();
        assert_eq!(coalescer.state(), MotorState::default());
        assert!(coalescer.flush().is_none());
    }
}
