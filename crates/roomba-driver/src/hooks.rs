//! 遥测订阅（Hook System）
//!
//! IO 线程每解析出一帧完整遥测，就调用所有已注册的 [`TelemetryCallback`]。
//!
//! 两种用法：
//!
//! - 直接实现 [`TelemetryCallback`]，通过 [`HookManager::add_callback`] 注册
//! - 使用 [`TelemetrySubscription`]：内部是一个有界 channel，句柄 drop 时自动注销
//!
//! # 使用示例
//!
//! ```rust
//! use roomba_driver::hooks::{HookManager, TelemetrySubscription};
//! use roomba_protocol::Telemetry;
//! use parking_lot::RwLock;
//! use std::sync::Arc;
//!
//! let hooks = Arc::new(RwLock::new(HookManager::new()));
//! let subscription = TelemetrySubscription::register(&hooks, 8);
//! assert_eq!(hooks.read().len(), 1);
//!
//! hooks.read().trigger_all(&Arc::new(Telemetry::default()));
//! assert!(subscription.try_recv().is_some());
//!
//! drop(subscription);
//! assert!(hooks.read().is_empty());
//! ```

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use parking_lot::RwLock;
use roomba_protocol::Telemetry;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::trace;

/// 遥测回调 Trait
///
/// 在 IO 线程中、持有订阅者读锁时被调用。实现必须非阻塞，
/// 推荐用 `try_send` 把数据转交给其他线程处理。
pub trait TelemetryCallback: Send + Sync {
    /// 收到一帧完整遥测时调用
    fn on_telemetry(&self, telemetry: &Arc<Telemetry>);
}

/// 回调注册 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(u64);

/// 钩子管理器
///
/// 本身不是线程安全的，由 `RwLock<HookManager>` 保护。
#[derive(Default)]
pub struct HookManager {
    next_id: u64,
    callbacks: Vec<(HookId, Arc<dyn TelemetryCallback>)>,
}

impl HookManager {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: 0,
            callbacks: Vec::new(),
        }
    }

    /// 添加回调，返回用于注销的 ID
    pub fn add_callback(&mut self, callback: Arc<dyn TelemetryCallback>) -> HookId {
        let id = HookId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, callback));
        id
    }

    /// 注销回调，ID 不存在时返回 false
    pub fn remove_callback(&mut self, id: HookId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(hook_id, _)| *hook_id != id);
        self.callbacks.len() != before
    }

    /// 移除所有回调
    pub fn clear(&mut self) {
        self.callbacks.clear();
    }

    /// 按注册顺序触发所有回调
    pub fn trigger_all(&self, telemetry: &Arc<Telemetry>) {
        for (_, callback) in &self.callbacks {
            callback.on_telemetry(telemetry);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

/// 把遥测转发到 channel 的回调
///
/// 队列满时丢弃新帧（订阅者处理不过来时只会错过中间帧）。
pub struct ChannelCallback {
    tx: Sender<Arc<Telemetry>>,
}

impl ChannelCallback {
    pub fn new(tx: Sender<Arc<Telemetry>>) -> Self {
        Self { tx }
    }
}

impl TelemetryCallback for ChannelCallback {
    fn on_telemetry(&self, telemetry: &Arc<Telemetry>) {
        match self.tx.try_send(Arc::clone(telemetry)) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) => trace!("telemetry subscriber lagging, frame dropped"),
            Err(TrySendError::Disconnected(_)) => {},
        }
    }
}

/// 把闭包包装为回调
pub struct FnCallback<F>(pub F);

impl<F> TelemetryCallback for FnCallback<F>
where
    F: Fn(&Telemetry) + Send + Sync,
{
    fn on_telemetry(&self, telemetry: &Arc<Telemetry>) {
        (self.0)(telemetry.as_ref())
    }
}

/// 遥测订阅句柄
///
/// drop 时自动注销。
pub struct TelemetrySubscription {
    id: HookId,
    rx: Receiver<Arc<Telemetry>>,
    hooks: Weak<RwLock<HookManager>>,
}

impl TelemetrySubscription {
    /// 在钩子管理器上注册一个容量为 `capacity` 的 channel 订阅
    pub fn register(hooks: &Arc<RwLock<HookManager>>, capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        let id = hooks.write().add_callback(Arc::new(ChannelCallback::new(tx)));
        Self {
            id,
            rx,
            hooks: Arc::downgrade(hooks),
        }
    }

    pub fn id(&self) -> HookId {
        self.id
    }

    /// 阻塞等待下一帧，驱动已销毁时返回 `None`
    pub fn recv(&self) -> Option<Arc<Telemetry>> {
        self.rx.recv().ok()
    }

    /// 带超时等待下一帧
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Arc<Telemetry>> {
        match self.rx.recv_timeout(timeout) {
            Ok(telemetry) => Some(telemetry),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// 非阻塞读取
    pub fn try_recv(&self) -> Option<Arc<Telemetry>> {
        self.rx.try_recv().ok()
    }

    /// 当前排队的帧数
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// 底层接收端（用于 `select!`）
    pub fn receiver(&self) -> &Receiver<Arc<Telemetry>> {
        &self.rx
    }
}

impl Drop for TelemetrySubscription {
    fn drop(&mut self) {
        if let Some(hooks) = self.hooks.upgrade() {
            hooks.write().remove_callback(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct CountingCallback {
        count: Arc<AtomicU64>,
    }

    impl TelemetryCallback for CountingCallback {
        fn on_telemetry(&self, _telemetry: &Arc<Telemetry>) {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_add_and_remove_callback() {
        let mut hooks = HookManager::new();
        assert!(hooks.is_empty());

        let count = Arc::new(AtomicU64::new(0));
        let id = hooks.add_callback(Arc::new(CountingCallback {
            count: count.clone(),
        }));
        assert_eq!(hooks.len(), 1);

        hooks.trigger_all(&Arc::new(Telemetry::default()));
        assert_eq!(count.load(Ordering::Relaxed), 1);

        assert!(hooks.remove_callback(id));
        assert!(!hooks.remove_callback(id));
        hooks.trigger_all(&Arc::new(Telemetry::default()));
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_ids_are_unique() {
        let mut hooks = HookManager::new();
        let a = hooks.add_callback(Arc::new(FnCallback(|_: &Telemetry| {})));
        let b = hooks.add_callback(Arc::new(FnCallback(|_: &Telemetry| {})));
        assert_ne!(a, b);
        hooks.clear();
        assert!(hooks.is_empty());
    }

    #[test]
    fn test_fn_callback() {
        let count = Arc::new(AtomicU64::new(0));
        let seen = count.clone();
        let mut hooks = HookManager::new();
        hooks.add_callback(Arc::new(FnCallback(move |_: &Telemetry| {
            seen.fetch_add(1, Ordering::Relaxed);
        })));
        hooks.trigger_all(&Arc::new(Telemetry::default()));
        hooks.trigger_all(&Arc::new(Telemetry::default()));
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_subscription_receives_and_unsubscribes_on_drop() {
        let hooks = Arc::new(RwLock::new(HookManager::new()));
        let subscription = TelemetrySubscription::register(&hooks, 4);

        hooks.read().trigger_all(&Arc::new(Telemetry::default()));
        assert_eq!(subscription.pending(), 1);
        assert!(subscription.recv_timeout(Duration::from_millis(10)).is_some());
        assert!(subscription.try_recv().is_none());

        drop(subscription);
        assert!(hooks.read().is_empty());
    }

    #[test]
    fn test_subscription_full_queue_drops_frames() {
        let hooks = Arc::new(RwLock::new(HookManager::new()));
        let subscription = TelemetrySubscription::register(&hooks, 2);
        for _ in 0..5 {
            hooks.read().trigger_all(&Arc::new(Telemetry::default()));
        }
        assert_eq!(subscription.pending(), 2);
    }

    #[test]
    fn test_subscription_outlives_manager() {
        let hooks = Arc::new(RwLock::new(HookManager::new()));
        let subscription = TelemetrySubscription::register(&hooks, 1);
        drop(hooks);
        // 管理器已销毁，发送端随之释放
        assert!(subscription.recv().is_none());
        drop(subscription);
    }
}
