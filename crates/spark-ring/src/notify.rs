use alloc::sync::Arc;
use core::fmt;

use crate::{RingBuffer, cursor::Availability};

/// `ThresholdListener` 描述环形缓冲在可用量达到阈值时的通知入口。
///
/// # 设计初衷（Why）
/// - 生产者/消费者常以“数据够一批再处理”“空间够一帧再写入”的方式协作，
///   由缓冲在每次读写后主动检查阈值，可避免调用方反复轮询 [`RingBuffer::available`]。
///
/// # 使用方式（How）
/// - 闭包 `Fn(&RingBuffer<T>, Availability)` 自动实现本 trait，绝大多数场景直接传闭包即可；
/// - 需要携带状态或复用同一监听器时，可自行实现并以 `Arc<dyn ThresholdListener<T>>` 安装。
///
/// # 契约定义（What）
/// - `ring`：触发通知的缓冲本身，监听器可以重入调用其任意方法；
/// - `available`：触发操作完成游标更新、释放互斥锁之前捕获的快照；
/// - **前置条件**：调用发生在锁外，因此并发读写可能在快照之后继续改变状态，
///   需要“当前”状态时应在回调内重新查询；
/// - 监听器不应 panic，否则 panic 会沿触发它的 `read`/`write` 调用传播。
pub trait ThresholdListener<T>: Send + Sync + 'static {
    /// 阈值条件成立时被调用一次。
    fn on_threshold(&self, ring: &RingBuffer<T>, available: Availability);
}

impl<T, F> ThresholdListener<T> for F
where
    T: 'static,
    F: Fn(&RingBuffer<T>, Availability) + Send + Sync + 'static,
{
    fn on_threshold(&self, ring: &RingBuffer<T>, available: Availability) {
        self(ring, available)
    }
}

/// 已安装的 `(监听器, 阈值)` 组合。
pub(crate) struct Threshold<T> {
    listener: Arc<dyn ThresholdListener<T>>,
    level: usize,
}

impl<T> Clone for Threshold<T> {
    fn clone(&self) -> Self {
        Self {
            listener: Arc::clone(&self.listener),
            level: self.level,
        }
    }
}

impl<T> fmt::Debug for Threshold<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Threshold")
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

impl<T> Threshold<T> {
    pub(crate) fn new(listener: Arc<dyn ThresholdListener<T>>, level: usize) -> Self {
        Self { listener, level }
    }

    /// 在锁内对操作后的观测值求值；条件成立时返回待触发的通知，交由调用方在解锁后执行。
    pub(crate) fn arm(&self, observed: usize, available: Availability) -> Option<Notification<T>> {
        (observed >= self.level).then(|| Notification {
            listener: Arc::clone(&self.listener),
            available,
        })
    }
}

/// 已判定需要触发、但尚未执行的通知。
///
/// 持有监听器的独立引用，因此即使触发前另一线程替换或移除了回调，
/// 本次通知仍会送达判定时安装的那个监听器。
#[must_use = "notification must be fired after the ring guard is released"]
pub(crate) struct Notification<T> {
    listener: Arc<dyn ThresholdListener<T>>,
    available: Availability,
}

impl<T: 'static> Notification<T> {
    pub(crate) fn fire(self, ring: &RingBuffer<T>) {
        tracing::trace!(
            readable = self.available.readable,
            writable = self.available.writable,
            rewindable = self.available.rewindable,
            "ring threshold reached"
        );
        self.listener.on_threshold(ring, self.available);
    }
}
