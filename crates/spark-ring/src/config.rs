//! 构造期配置：`{capacity, backlog}` 两个参数及其校验。
//!
//! # 设计总览（Why）
//! - 环形缓冲只在构造时接受配置，之后容量与回溯窗口均不可变；
//!   把校验集中在此处，`RingBuffer` 的热路径即可假定 `backlog <= capacity` 恒成立；
//! - 支持 `serde` 反序列化，宿主可以把缓冲尺寸与其它组件配置放在同一份文档中。
//!
//! # 集成说明（How）
//! - 代码内构造：`RingConfig::new(4096).with_backlog(512).build::<u8>()`；
//! - 文档加载（`std`）：`RingConfig::from_toml_str("capacity = 4096\nbacklog = 512")`。

use serde::{Deserialize, Serialize};

use crate::{RingBuffer, RingError};

/// 环形缓冲构造参数。
///
/// # 契约说明（What）
/// - `capacity`：后备存储的元素总数，允许为 0（此时任何非空写入都会溢出）；
/// - `backlog`：已读取元素中保留用于回溯的最大数量，缺省为 0，必须满足 `backlog <= capacity`；
/// - 反序列化拒绝未知字段，避免拼写错误被静默忽略。
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RingConfig {
    pub capacity: usize,
    #[serde(default)]
    pub backlog: usize,
}

impl RingConfig {
    /// 以给定容量、零回溯窗口创建配置。
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            backlog: 0,
        }
    }

    pub fn with_backlog(mut self, backlog: usize) -> Self {
        self.backlog = backlog;
        self
    }

    /// 校验 `backlog <= capacity`。
    pub fn validate(&self) -> Result<(), RingError> {
        if self.backlog > self.capacity {
            return Err(RingError::InvalidConfig {
                capacity: self.capacity,
                backlog: self.backlog,
            });
        }
        Ok(())
    }

    /// 按本配置构造环形缓冲，等价于 [`RingBuffer::with_config`]。
    pub fn build<T>(&self) -> Result<RingBuffer<T>, RingError>
    where
        T: Copy + Default + Send + 'static,
    {
        RingBuffer::with_config(self)
    }

    /// 从 TOML 文档解析配置并完成校验。
    ///
    /// 文档顶层即为配置表，例如：
    ///
    /// ```toml
    /// capacity = 4096
    /// backlog = 512
    /// ```
    #[cfg(feature = "std")]
    pub fn from_toml_str(document: &str) -> Result<Self, RingError> {
        use alloc::string::ToString;

        let config: Self = toml::from_str(document).map_err(|err| RingError::ConfigParse {
            detail: err.message().to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }
}
