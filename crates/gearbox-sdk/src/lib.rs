//! GearBox SDK - 设备驱动线程工具集
//!
//! 在设备轮询线程与消费线程之间安全地传递数据，并管理长时间运行的工作线程。
//!
//! # 组成
//!
//! - **同步原语** (`sync`): [`Timer`]、单槽邮箱 [`Store`]、有界队列 [`Buffer`]
//! - **状态** (`status`): [`SubsystemState`] 状态机与 [`Status`] 上报协作者
//! - **工作线程** (`thread`): [`SubsystemThread`]，带心跳与卡顿检测
//!
//! # 快速开始
//!
//! ```rust
//! use gearbox_sdk::prelude::*;
//! use std::sync::Arc;
//!
//! gearbox_sdk::init_logger();
//!
//! let scans = Buffer::new(BufferConfig::bounded(16, BufferPolicy::OverwriteOldest));
//! let producer = scans.handle();
//! let status = Arc::new(LocalStatus::new());
//!
//! let device = SubsystemThread::builder("laser")
//!     .status(status.clone())
//!     .spawn(move |ctx| {
//!         for scan in 1..=3u32 {
//!             if ctx.is_stopping() {
//!                 break;
//!             }
//!             let _ = producer.push(scan)?;
//!             ctx.heartbeat();
//!         }
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! device.join().unwrap();
//! assert_eq!(device.state(), SubsystemState::Finished);
//! assert_eq!(scans.pop().unwrap(), 1);
//! assert_eq!(scans.len(), 2);
//! ```

mod logging;
pub mod prelude;

// 按层访问
pub use gearbox_status as status;
pub use gearbox_sync as sync;
pub use gearbox_thread as thread;

// --- 常用类型 ---

pub use gearbox_sync::{
    Buffer, BufferConfig, BufferHandle, BufferPolicy, PushError, PushOutcome, Store, StoreCursor,
    StoreReader, SyncError, Timer, Version,
};

pub use gearbox_status::{
    LocalStatus, Status, StatusError, SubStatus, SubsystemState, SubsystemStatus, TrivialStatus,
};

pub use gearbox_thread::{
    StallDetection, Subsystem, SubsystemConfig, SubsystemContext, SubsystemThread,
    SubsystemThreadBuilder, ThreadError,
};

pub use logging::init_logger;
