use alloc::{boxed::Box, sync::Arc, vec::Vec};
use core::fmt;

use crate::{
    config::RingConfig,
    cursor::{Availability, Cursors},
    error::RingError,
    notify::{Notification, Threshold, ThresholdListener},
    sync::Mutex,
};

/// `RingBuffer` 是定长、线程安全、支持回溯的环形缓冲。
///
/// # 模块角色（Why）
/// - 为生产者/消费者之间的批量数据交换提供固定内存占用的中转区，写满即返回
///   [`RingError::Overflow`]、读空即返回 [`RingError::Underflow`]，从不阻塞；
/// - 回溯窗口（backlog）允许消费者在解析失败、协议回退等场景下重新读取最近消费的元素，
///   而无需调用方自行缓存副本；
/// - 阈值通知让调用方在“数据够一批”或“空间够一帧”时被动唤起，免去轮询。
///
/// # 核心机制（How）
/// - 全部可变状态（存储、游标、回调）位于同一把互斥锁之后，每个操作在整个执行期间持锁，
///   三个可用量因此总是来自同一个一致视图；
/// - 读写采用“先判定、再拷贝、后推进”的顺序，跨越存储末尾的传输拆成至多两段连续拷贝，
///   判定失败时游标与回溯预算保持原样；
/// - 通知在锁内判定、在锁外触发：判定时克隆监听器引用并捕获操作后的快照，
///   释放锁后再调用，因此监听器可以安全地重入本缓冲。
///
/// # 契约说明（What）
/// - **线程安全**：`T: Send` 时 `RingBuffer<T>` 为 `Send + Sync`，可置于 `Arc` 中跨线程共享；
/// - **公平性**：只保证互斥，不保证多个并发写者或读者之间的先后顺序；
/// - **生命周期**：[`RingBuffer::destroy`] 或 `Drop` 释放存储；所有权规则保证其后不可再访问，
///   也不存在越过单次调用的存储别名。
///
/// # 设计权衡（Trade-offs）
/// - 使用自旋锁（`spin::Mutex`）以便在 `no_std` 下工作；临界区与传输长度成正比，
///   大块传输在高争用下会放大自旋开销，此类场景建议拆分为较小批次；
/// - 通知采用电平触发：只要操作后的可用量不低于阈值即触发一次，而非仅在首次跨越时触发。
pub struct RingBuffer<T = u8> {
    capacity: usize,
    backlog: usize,
    state: Mutex<RingState<T>>,
}

struct RingState<T> {
    store: Box<[T]>,
    cursors: Cursors,
    read_callback: Option<Threshold<T>>,
    write_callback: Option<Threshold<T>>,
}

impl<T> RingBuffer<T>
where
    T: Copy + Default + Send + 'static,
{
    /// 以 `(capacity, backlog)` 创建环形缓冲。
    ///
    /// # 参数与契约
    /// - `capacity`：后备存储的元素数，允许为 0；
    /// - `backlog`：回溯窗口大小，必须满足 `backlog <= capacity`，否则返回
    ///   [`RingError::InvalidConfig`]；
    /// - **后置条件**：读写游标与回溯预算均为 0，`available()` 返回 `(0, capacity - backlog, 0)`。
    ///
    /// # 异常处理
    /// 存储通过可失败的预留完成，分配失败时返回 [`RingError::Allocation`]，不会中止进程。
    pub fn new(capacity: usize, backlog: usize) -> Result<Self, RingError> {
        Self::with_config(&RingConfig { capacity, backlog })
    }

    /// 按 [`RingConfig`] 创建环形缓冲。
    pub fn with_config(config: &RingConfig) -> Result<Self, RingError> {
        config.validate()?;
        let store = allocate_store(config.capacity)?;
        tracing::debug!(
            capacity = config.capacity,
            backlog = config.backlog,
            "ring buffer created"
        );
        Ok(Self {
            capacity: config.capacity,
            backlog: config.backlog,
            state: Mutex::new(RingState {
                store,
                cursors: Cursors::new(config.capacity, config.backlog),
                read_callback: None,
                write_callback: None,
            }),
        })
    }

    /// 复制当前缓冲：存储内容、游标、回溯预算与已安装的回调一并复制。
    ///
    /// # 实现策略
    /// 1. 持有源缓冲的锁，在锁内为副本分配存储并拷贝内容，得到一致快照；
    /// 2. 释放源锁后再以快照构造新实例，全程只持有一把锁，不存在锁序问题；
    /// 3. 回调以 `Arc` 共享，副本与源缓冲会通知同一组监听器。
    pub fn try_clone(&self) -> Result<Self, RingError> {
        let snapshot = {
            let state = self.state.lock();
            RingState {
                store: copy_store(&state.store)?,
                cursors: state.cursors,
                read_callback: state.read_callback.clone(),
                write_callback: state.write_callback.clone(),
            }
        };
        tracing::debug!(
            capacity = self.capacity,
            backlog = self.backlog,
            "ring buffer cloned"
        );
        Ok(Self {
            capacity: self.capacity,
            backlog: self.backlog,
            state: Mutex::new(snapshot),
        })
    }

    /// 写入 `data` 的全部元素，要么全部成功，要么不写入任何元素。
    ///
    /// # 参数与契约
    /// - 可写空间为 `capacity - backlog + rewind_budget - readable`；
    ///   `data.len()` 超出时返回 [`RingError::Overflow`]，缓冲保持不变；
    /// - 空切片必然成功且不推进游标，但阈值仍按当前状态判定：
    ///   已有可读量满足阈值时同样触发读回调；
    /// - 成功后若已安装读回调且写后可读量 `>= threshold`，在释放锁后触发恰好一次。
    pub fn write(&self, data: &[T]) -> Result<(), RingError> {
        let armed = {
            let mut state = self.state.lock();
            state.write_slice(data)
        }
        .inspect_err(|err| tracing::trace!(code = err.code(), %err, "ring write rejected"))?;
        if let Some(notification) = armed {
            notification.fire(self);
        }
        Ok(())
    }

    /// 读取恰好 `out.len()` 个元素到 `out`，要么全部成功，要么不读取任何元素。
    ///
    /// # 参数与契约
    /// - `out.len()` 超过可读量时返回 [`RingError::Underflow`]，`out` 与缓冲均保持不变；
    /// - 成功后回溯预算按 `min(rewind_budget, out.len())` 递减；
    /// - 成功后若已安装写回调且读后可写量 `>= threshold`，在释放锁后触发恰好一次；
    ///   空切片同样判定阈值，与 [`RingBuffer::write`] 一致。
    pub fn read(&self, out: &mut [T]) -> Result<(), RingError> {
        let armed = {
            let mut state = self.state.lock();
            state.read_slice(out)
        }
        .inspect_err(|err| tracing::trace!(code = err.code(), %err, "ring read rejected"))?;
        if let Some(notification) = armed {
            notification.fire(self);
        }
        Ok(())
    }

    /// 读取 `len` 个元素并以新分配的 `Vec` 返回，语义与 [`RingBuffer::read`] 相同。
    ///
    /// 输出缓冲在加锁前分配，临界区只包含判定与拷贝；无法满足的 `len`
    /// 以 [`RingError::Allocation`] 返回，而非中止进程。
    pub fn read_vec(&self, len: usize) -> Result<Vec<T>, RingError> {
        let mut out = allocate_store(len)?.into_vec();
        self.read(&mut out)?;
        Ok(out)
    }

    /// 将最近消费的 `len` 个元素重新纳入可读区。
    ///
    /// # 参数与契约
    /// - 要求 `len <= min(read_cursor, backlog - rewind_budget)`，即既不越过逻辑起点，
    ///   也不使占用量超出物理容量；否则返回 [`RingError::Underflow`]，无任何副作用；
    /// - 成功后可读量增加 `len`，回溯预算增加 `len`，可写量保持不变：
    ///   这些元素仍在存储中，需要受到保护直至被重新读取；
    /// - 回溯不触发任何通知。
    pub fn rewind(&self, len: usize) -> Result<(), RingError> {
        let outcome = self.state.lock().cursors.rewind(len);
        outcome.inspect_err(|err| tracing::trace!(code = err.code(), %err, "ring rewind rejected"))
    }

    /// 返回 `(readable, writable, rewindable)` 的一致快照。
    pub fn available(&self) -> Availability {
        self.state.lock().cursors.availability()
    }

    /// 当前没有可读元素时返回 `true`。
    pub fn is_empty(&self) -> bool {
        self.available().readable == 0
    }

    /// 当前可写量为 0 时返回 `true`（回溯保护窗口占用的空间不计入可写量）。
    pub fn is_full(&self) -> bool {
        self.available().writable == 0
    }

    /// 安装读回调：每次成功写入后，若可读量 `>= threshold` 则触发。
    ///
    /// 替换已有读回调；移除请使用 [`RingBuffer::clear_read_callback`]。
    pub fn set_read_callback<F>(&self, callback: F, threshold: usize)
    where
        F: Fn(&RingBuffer<T>, Availability) + Send + Sync + 'static,
    {
        self.set_read_listener(Arc::new(callback), threshold);
    }

    /// 以 trait 对象形式安装读回调，便于多个缓冲共享同一监听器。
    pub fn set_read_listener(&self, listener: Arc<dyn ThresholdListener<T>>, threshold: usize) {
        self.state.lock().read_callback = Some(Threshold::new(listener, threshold));
    }

    /// 移除读回调；此后的写入不再触发通知。
    pub fn clear_read_callback(&self) {
        self.state.lock().read_callback = None;
    }

    /// 安装写回调：每次成功读取后，若可写量 `>= threshold` 则触发。
    ///
    /// 替换已有写回调；移除请使用 [`RingBuffer::clear_write_callback`]。
    pub fn set_write_callback<F>(&self, callback: F, threshold: usize)
    where
        F: Fn(&RingBuffer<T>, Availability) + Send + Sync + 'static,
    {
        self.set_write_listener(Arc::new(callback), threshold);
    }

    /// 以 trait 对象形式安装写回调。
    pub fn set_write_listener(&self, listener: Arc<dyn ThresholdListener<T>>, threshold: usize) {
        self.state.lock().write_callback = Some(Threshold::new(listener, threshold));
    }

    /// 移除写回调；此后的读取不再触发通知。
    pub fn clear_write_callback(&self) {
        self.state.lock().write_callback = None;
    }

    /// 显式销毁缓冲，释放存储与锁。等价于 `drop(ring)`。
    pub fn destroy(self) {
        tracing::debug!(
            capacity = self.capacity,
            backlog = self.backlog,
            "ring buffer destroyed"
        );
    }
}

impl<T> RingBuffer<T> {
    /// 后备存储的元素总数。
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 回溯窗口大小。
    pub fn backlog(&self) -> usize {
        self.backlog
    }
}

impl<T> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("backlog", &self.backlog)
            .field("available", &state.cursors.availability())
            .field("read_callback", &state.read_callback)
            .field("write_callback", &state.write_callback)
            .finish()
    }
}

impl<T: Copy> RingState<T> {
    fn write_slice(&mut self, data: &[T]) -> Result<Option<Notification<T>>, RingError> {
        self.cursors.check_write(data.len())?;
        if !data.is_empty() {
            let offset = self.cursors.write_offset();
            copy_in(&mut self.store, offset, data);
            self.cursors.commit_write(data.len());
        }

        let available = self.cursors.availability();
        Ok(self
            .read_callback
            .as_ref()
            .and_then(|callback| callback.arm(available.readable, available)))
    }

    fn read_slice(&mut self, out: &mut [T]) -> Result<Option<Notification<T>>, RingError> {
        self.cursors.check_read(out.len())?;
        if !out.is_empty() {
            let offset = self.cursors.read_offset();
            copy_out(&self.store, offset, out);
            self.cursors.commit_read(out.len());
        }

        let available = self.cursors.availability();
        Ok(self
            .write_callback
            .as_ref()
            .and_then(|callback| callback.arm(available.writable, available)))
    }
}

/// 从物理偏移 `offset` 起写入 `src`，越过存储末尾的部分回绕到开头。
///
/// 调用方保证 `0 < src.len() <= store.len()` 且 `offset < store.len()`。
fn copy_in<T: Copy>(store: &mut [T], offset: usize, src: &[T]) {
    let first = (store.len() - offset).min(src.len());
    store[offset..offset + first].copy_from_slice(&src[..first]);
    store[..src.len() - first].copy_from_slice(&src[first..]);
}

/// [`copy_in`] 的反方向。
fn copy_out<T: Copy>(store: &[T], offset: usize, out: &mut [T]) {
    let first = (store.len() - offset).min(out.len());
    let (head, tail) = out.split_at_mut(first);
    head.copy_from_slice(&store[offset..offset + first]);
    tail.copy_from_slice(&store[..tail.len()]);
}

fn allocate_store<T: Copy + Default>(capacity: usize) -> Result<Box<[T]>, RingError> {
    let mut store = Vec::new();
    store
        .try_reserve_exact(capacity)
        .map_err(|_| RingError::Allocation { capacity })?;
    store.resize(capacity, T::default());
    Ok(store.into_boxed_slice())
}

fn copy_store<T: Copy>(source: &[T]) -> Result<Box<[T]>, RingError> {
    let mut store = Vec::new();
    store
        .try_reserve_exact(source.len())
        .map_err(|_| RingError::Allocation {
            capacity: source.len(),
        })?;
    store.extend_from_slice(source);
    Ok(store.into_boxed_slice())
}
