//
// 教案级说明：生产构建使用 `spin::Mutex`，以便在 `no_std` 环境同样可用；
// 启用 `--cfg loom`/`--cfg spark_loom` 时切换到 Loom 提供的互斥量，
// 让模型检查器能够穷举“加锁修改 -> 释放 -> 通知”协议的全部调度交错。
// 两种实现都只暴露 `new`/`lock`，调用方无需区分。

#[cfg(not(any(loom, spark_loom)))]
pub(crate) use spin::MutexGuard;

#[cfg(any(loom, spark_loom))]
pub(crate) use loom::sync::MutexGuard;

pub(crate) struct Mutex<T> {
    #[cfg(not(any(loom, spark_loom)))]
    inner: spin::Mutex<T>,
    #[cfg(any(loom, spark_loom))]
    inner: loom::sync::Mutex<T>,
}

impl<T> Mutex<T> {
    #[cfg(not(any(loom, spark_loom)))]
    pub(crate) fn new(value: T) -> Self {
        Self {
            inner: spin::Mutex::new(value),
        }
    }

    #[cfg(any(loom, spark_loom))]
    pub(crate) fn new(value: T) -> Self {
        Self {
            inner: loom::sync::Mutex::new(value),
        }
    }

    #[cfg(not(any(loom, spark_loom)))]
    pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock()
    }

    // 通知回调从不在持锁期间执行，回调 panic 不会污染锁；模型中出现中毒即视为测试失败路径，直接取回内部值。
    #[cfg(any(loom, spark_loom))]
    pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
