//! # GearBox Thread
//!
//! 受管工作线程 [`SubsystemThread`]：显式的生命周期、心跳与卡顿检测，
//! 状态变化上报给外部的 [`gearbox_status::Status`]。
//!
//! ## 状态机
//!
//! `Initializing → Working ⇄ Stalled → ShuttingDown → Finished`，
//! 任意非终止状态都可进入 `Fault`。
//!
//! ## 卡顿检测
//!
//! 由 [`SubsystemConfig::stall_detection`] 选择：关闭、只接受工作体主动上报，
//! 或由看门狗线程根据心跳自动判定（默认）。

mod config;
mod context;
mod error;
mod shared;
mod thread;
mod watchdog;

pub use config::{StallDetection, SubsystemConfig};
pub use context::SubsystemContext;
pub use error::ThreadError;
pub use thread::{Subsystem, SubsystemThread, SubsystemThreadBuilder};
