//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use gearbox_sdk::prelude::*;
//! ```

// 同步原语
pub use crate::sync::{Buffer, BufferConfig, BufferPolicy, PushOutcome, Store, Timer, Version};

// 状态
pub use crate::status::{LocalStatus, Status, SubsystemState, TrivialStatus};

// 工作线程
pub use crate::thread::{
    StallDetection, SubsystemConfig, SubsystemContext, SubsystemThread,
};

// 错误类型
pub use crate::sync::{PushError, SyncError};
pub use crate::thread::ThreadError;
