#![cfg_attr(not(feature = "std"), no_std)]

//! `spark-ring` 提供带回溯窗口与阈值通知的定长线程安全环形缓冲。
//!
//! # 模块定位（Why）
//! - 为传输栈、编解码器之间的批量字节交换提供固定内存占用的中转区，
//!   写满/读空立即以错误返回，背压与重试策略完全交给调用方；
//! - 回溯窗口允许消费者在解析失败或协议回退时重新读取最近消费的数据，
//!   省去调用方自行缓存副本的开销；
//! - 阈值通知把“够一批数据”“够一帧空间”的判定下沉到缓冲内部，避免轮询。
//!
//! # 设计概要（How）
//! - `cursor` 模块以单调递增的 `u64` 游标承载全部不变量，纯算术、可独立属性测试；
//! - `ring` 模块实现 [`RingBuffer`]，以单把互斥锁保护存储、游标与回调，
//!   通知在锁内判定、锁外触发，监听器可安全重入；
//! - `config` 模块负责构造参数的校验与 `serde`/TOML 加载；
//! - `error` 模块定义 [`RingError`] 及稳定错误码。
//!
//! # 使用示例
//!
//! ```
//! use spark_ring::RingBuffer;
//!
//! let ring = RingBuffer::<u8>::new(8, 2)?;
//! ring.write(b"abc")?;
//!
//! let mut head = [0u8; 2];
//! ring.read(&mut head)?;
//! assert_eq!(&head, b"ab");
//!
//! // 最近消费的两个字节仍在回溯窗口内，可以重新读取。
//! ring.rewind(2)?;
//! assert_eq!(ring.read_vec(3)?, b"abc");
//! # Ok::<(), spark_ring::RingError>(())
//! ```

extern crate alloc;

mod config;
mod cursor;
mod error;
mod notify;
mod ring;
mod sync;

pub use config::RingConfig;
pub use cursor::Availability;
pub use error::{RingError, codes};
pub use notify::ThresholdListener;
pub use ring::RingBuffer;
