//! # GearBox Sync - 线程间数据交换原语
//!
//! 设备轮询线程与消费线程之间安全传递数据的基础设施：
//!
//! - [`Timer`]: 单调秒表，用于超时和心跳计时
//! - [`Store`]: 单槽邮箱，保存最近一次写入的值，读者按版本号等待新数据
//! - [`Buffer`]: 有界 FIFO 队列，支持 Block / OverwriteOldest / DropNewest 三种溢出策略
//!
//! ## 阻塞与释放
//!
//! 所有阻塞操作都有带超时的版本。`Store`/`Buffer` 的所有者 drop 时，
//! 阻塞在它上面的线程会被唤醒并返回 [`SyncError::NotAvailable`]，不会永久挂起。
//!
//! ## Feature Flags
//!
//! - `serde` - 为 `BufferConfig`/`BufferPolicy` 派生序列化

pub mod buffer;
mod error;
pub mod store;
mod timer;

pub use buffer::{Buffer, BufferConfig, BufferHandle, BufferPolicy, PushOutcome};
pub use error::{PushError, SyncError};
pub use store::{Store, StoreCursor, StoreReader, Version};
pub use timer::Timer;
