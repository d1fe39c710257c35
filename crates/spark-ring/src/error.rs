//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义环形缓冲对外暴露的全部失败语义，调用方只需匹配一个枚举即可决定重试或放弃；
//! - 为每个变体分配稳定的点分错误码，便于日志、告警按码聚合，而不依赖易变的自然语言描述。
//!
//! ## 设计要求（What）
//! - 派生 `thiserror::Error`，在 `no_std` 下同样实现 `core::error::Error`；
//! - 所有变体均为 `Clone + Eq`，测试可直接 `assert_eq!` 比较；
//! - `Overflow`/`Underflow` 属于预期的背压信号，失败时缓冲状态保持不变。

#[cfg(feature = "std")]
use alloc::string::String;

use thiserror::Error;

/// 稳定错误码集合，与 [`RingError::code`] 一一对应。
pub mod codes {
    /// 后备存储无法分配。
    pub const ALLOCATION_FAILED: &str = "ring.allocation_failed";
    /// 构造参数违反 `backlog <= capacity`。
    pub const INVALID_CONFIG: &str = "ring.invalid_config";
    /// 写入长度超过可写空间。
    pub const OVERFLOW: &str = "ring.overflow";
    /// 读取或回溯长度超过可用数据。
    pub const UNDERFLOW: &str = "ring.underflow";
    /// 配置文档无法解码。
    pub const CONFIG_PARSE: &str = "ring.config_parse";
}

/// 环形缓冲错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：把“调用方可自行恢复的背压信号”与“构造期致命错误”放在同一枚举中，
///   借助 [`RingError::is_recoverable`] 区分处理策略。
/// - **契约 (What)**：
///   - 任一变体返回时，缓冲的游标与回溯预算都与调用前完全一致；
///   - 库内部不重试、不吞错，传播策略完全交给调用方。
/// - **设计权衡 (Trade-offs)**：变体携带请求量与可用量，而不是仅返回布尔失败，
///   方便调用方直接计算补偿长度；代价是枚举体积略大于单纯的错误码。
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RingError {
    /// 后备存储分配失败，构造被整体放弃，不会泄露半初始化实例。
    #[error("failed to allocate ring storage for {capacity} elements")]
    Allocation { capacity: usize },

    /// 回溯窗口大于总容量。
    #[error("backlog {backlog} exceeds ring capacity {capacity}")]
    InvalidConfig { capacity: usize, backlog: usize },

    /// 写入长度超过当前可写空间；缓冲保持不变。
    #[error("write of {requested} elements overflows ring ({writable} writable)")]
    Overflow { requested: usize, writable: usize },

    /// 读取或回溯长度超过当前可读/可回溯量；缓冲保持不变。
    #[error("request of {requested} elements underflows ring ({available} available)")]
    Underflow { requested: usize, available: usize },

    /// 配置文档解析失败，`detail` 保留底层解析器的描述。
    #[cfg(feature = "std")]
    #[error("invalid ring configuration document: {detail}")]
    ConfigParse { detail: String },
}

impl RingError {
    /// 返回稳定错误码，取值见 [`codes`]。
    pub fn code(&self) -> &'static str {
        match self {
            RingError::Allocation { .. } => codes::ALLOCATION_FAILED,
            RingError::InvalidConfig { .. } => codes::INVALID_CONFIG,
            RingError::Overflow { .. } => codes::OVERFLOW,
            RingError::Underflow { .. } => codes::UNDERFLOW,
            #[cfg(feature = "std")]
            RingError::ConfigParse { .. } => codes::CONFIG_PARSE,
        }
    }

    /// 是否为可恢复的背压信号。
    ///
    /// `Overflow`/`Underflow` 只说明“此刻空间或数据不足”，调用方可以稍后重试；
    /// 其余变体表示构造参数或资源问题，重试同样的输入不会成功。
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RingError::Overflow { .. } | RingError::Underflow { .. }
        )
    }
}
