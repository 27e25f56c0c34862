//! Ctrl-C 处理
//!
//! 信号只清除运行标志，由各命令的循环检查标志后退出，
//! 之后 `main` 统一断开连接。

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// 检查运行标志的间隔
const CHECK_INTERVAL: Duration = Duration::from_millis(20);

/// 安装 Ctrl-C 处理器，返回运行标志
pub fn install() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nReceived interrupt signal. Shutting down...");
        flag.store(false, Ordering::Release);
    })
    .context("failed to install Ctrl-C handler")?;
    Ok(running)
}

pub fn is_running(running: &AtomicBool) -> bool {
    running.load(Ordering::Acquire)
}

/// 分段睡眠，被中断时提前返回 `false`
pub fn sleep_while_running(running: &AtomicBool, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if !is_running(running) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(CHECK_INTERVAL));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_completes() {
        let running = AtomicBool::new(true);
        assert!(sleep_while_running(&running, Duration::from_millis(5)));
    }

    #[test]
    fn test_sleep_interrupted() {
        let running = AtomicBool::new(false);
        let start = Instant::now();
        assert!(!sleep_while_running(&running, Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
