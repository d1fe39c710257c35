//! 游标算术：环形缓冲全部不变量的唯一落点。
//!
//! # 设计背景（Why）
//! - 读写游标采用单调递增的 `u64` 计数，物理偏移由 `cursor % capacity` 得出，
//!   因而“满”与“空”无需额外标志位区分，`write - read` 即为占用量；
//! - 将算术与存储、加锁拆开，使不变量可以脱离并发环境被属性测试穷举验证。
//!
//! # 不变量（What）
//! - `0 <= write - read <= capacity - backlog + rewind_budget`；
//! - `rewind_budget <= backlog` 且 `rewind_budget <= read`；
//! - 对任意状态：`readable + writable == capacity - backlog + rewind_budget`。
//!
//! # 逻辑解析（How）
//! - `check_*` 只做判定、不改状态，调用方在判定成功后完成数据拷贝，再调用 `commit_*` 推进游标，
//!   由此保证失败路径“零副作用”；
//! - 回溯把已消费的元素重新纳入可读区，同时通过 `rewind_budget` 抬高可写上限的基准，
//!   保护这些仍驻留在存储中的元素不被新写入覆盖。

use crate::error::RingError;

/// 某一时刻的可用量快照，三个字段取自同一临界区。
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Availability {
    /// 已写入、尚未读取的元素数。
    pub readable: usize,
    /// 新写入可使用的元素数（已扣除回溯保护窗口）。
    pub writable: usize,
    /// 当前可通过 `rewind` 重新纳入可读区的元素数。
    pub rewindable: usize,
}

/// 读写游标与回溯预算。
///
/// # 契约说明（What）
/// - 构造时须满足 `backlog <= capacity`，由 [`crate::RingConfig`] 负责校验；
/// - 所有方法均为纯算术，不触碰存储，也不加锁。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Cursors {
    capacity: u64,
    backlog: u64,
    read: u64,
    write: u64,
    rewind_budget: u64,
}

impl Cursors {
    pub(crate) fn new(capacity: usize, backlog: usize) -> Self {
        debug_assert!(backlog <= capacity);
        Self {
            capacity: capacity as u64,
            backlog: backlog as u64,
            read: 0,
            write: 0,
            rewind_budget: 0,
        }
    }

    pub(crate) fn readable(&self) -> usize {
        (self.write - self.read) as usize
    }

    /// `capacity - backlog + rewind_budget - readable`。
    pub(crate) fn writable(&self) -> usize {
        let ceiling = self.capacity - self.backlog + self.rewind_budget;
        debug_assert!(ceiling >= self.write - self.read);
        (ceiling - (self.write - self.read)) as usize
    }

    /// `min(read, backlog - rewind_budget)`：既不能越过逻辑起点，也不能超出回溯窗口。
    pub(crate) fn rewindable(&self) -> usize {
        self.read.min(self.backlog - self.rewind_budget) as usize
    }

    pub(crate) fn availability(&self) -> Availability {
        Availability {
            readable: self.readable(),
            writable: self.writable(),
            rewindable: self.rewindable(),
        }
    }

    /// 写入物理起点；仅在 `capacity > 0` 时有意义。
    pub(crate) fn write_offset(&self) -> usize {
        (self.write % self.capacity) as usize
    }

    /// 读取物理起点；仅在 `capacity > 0` 时有意义。
    pub(crate) fn read_offset(&self) -> usize {
        (self.read % self.capacity) as usize
    }

    pub(crate) fn check_write(&self, len: usize) -> Result<(), RingError> {
        let writable = self.writable();
        if len > writable {
            return Err(RingError::Overflow {
                requested: len,
                writable,
            });
        }
        Ok(())
    }

    pub(crate) fn check_read(&self, len: usize) -> Result<(), RingError> {
        let readable = self.readable();
        if len > readable {
            return Err(RingError::Underflow {
                requested: len,
                available: readable,
            });
        }
        Ok(())
    }

    pub(crate) fn commit_write(&mut self, len: usize) {
        self.write += len as u64;
    }

    /// 推进读游标；新消费的元素不再算作“已回溯”，最早的回溯额度最先失效。
    pub(crate) fn commit_read(&mut self, len: usize) {
        let len = len as u64;
        self.read += len;
        self.rewind_budget -= self.rewind_budget.min(len);
    }

    /// 判定并执行回溯，失败时不改动任何字段。
    pub(crate) fn rewind(&mut self, len: usize) -> Result<(), RingError> {
        let rewindable = self.rewindable();
        if len > rewindable {
            return Err(RingError::Underflow {
                requested: len,
                available: rewindable,
            });
        }
        self.read -= len as u64;
        self.rewind_budget += len as u64;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn rewind_budget(&self) -> usize {
        self.rewind_budget as usize
    }
}
