//! 摇杆输入平滑
//!
//! 模拟摇杆的原始读数抖动较大。[`AxisSmoother`] 是一个时间窗口平均：
//! 每个读数在加入 `window` 之后过期，缓冲区始终保留最近一个已过期的读数，
//! 因此平均值覆盖"上一个稳定值 + 窗口内的新读数"。摇杆松开后，
//! 旧读数在一个窗口内全部过期，平均值回到新的位置。
//!
//! 所有方法显式接收 `now`，便于用确定的时间点测试。

use roomba_protocol::axis_from_byte;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// 默认缓冲区容量
pub const DEFAULT_SMOOTHING_CAPACITY: usize = 256;

/// 默认平滑窗口
pub const DEFAULT_SMOOTHING_WINDOW: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy)]
struct Sample {
    value: f64,
    expires_at: Option<Instant>,
}

/// 时间窗口平均缓冲区
#[derive(Debug, Clone)]
pub struct AxisSmoother {
    samples: VecDeque<Sample>,
    capacity: usize,
    window: Duration,
}

impl AxisSmoother {
    /// 创建缓冲区，初始包含一个 0 读数（摇杆居中）
    pub fn new(capacity: usize, window: Duration) -> Self {
        let capacity = capacity.max(1);
        let mut samples = VecDeque::with_capacity(capacity + 1);
        samples.push_back(Sample {
            value: 0.0,
            expires_at: None,
        });
        Self {
            samples,
            capacity,
            window,
        }
    }

    /// 加入一个归一化读数，超出容量时丢弃最旧的读数
    ///
    /// 非有限值被忽略。
    pub fn push(&mut self, value: f64, now: Instant) {
        if !value.is_finite() {
            return;
        }
        self.expire(now);
        self.samples.push_back(Sample {
            value,
            expires_at: Some(now + self.window),
        });
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// 加入一个 0..=255 的原始摇杆读数
    pub fn push_raw(&mut self, raw: u8, now: Instant) {
        self.push(axis_from_byte(raw), now);
    }

    /// 丢弃过期读数
    ///
    /// 每个过期的读数让队首前移一位，最新的过期读数保留下来作为基准值。
    pub fn expire(&mut self, now: Instant) {
        while let Some(next) = self.samples.get(1)
            && next.expires_at.is_some_and(|at| at <= now)
        {
            self.samples.pop_front();
        }
    }

    /// 在 `now` 时刻的平均值
    pub fn average(&mut self, now: Instant) -> f64 {
        self.expire(now);
        self.samples.iter().map(|s| s.value).sum::<f64>() / self.samples.len() as f64
    }

    /// 回到初始状态（单个 0 读数）
    pub fn clear(&mut self) {
        self.samples.clear();
        self.samples.push_back(Sample {
            value: 0.0,
            expires_at: None,
        });
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for AxisSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_CAPACITY, DEFAULT_SMOOTHING_WINDOW)
    }
}
