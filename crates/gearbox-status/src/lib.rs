//! # GearBox Status
//!
//! 子系统健康状态与状态上报协作者。
//!
//! ## 核心概念
//!
//! - [`SubsystemState`]：子系统生命周期状态机
//! - [`Status`]：状态上报协作者 Trait，由外部注入工作线程
//! - [`SubStatus`]：绑定单个子系统名称的上报句柄
//! - [`TrivialStatus`]：只写日志的实现
//! - [`LocalStatus`]：进程内注册表，支持心跳超期检查

mod error;
mod local;
mod state;
mod status;
mod trivial;

pub use error::StatusError;
pub use local::{LocalStatus, SubsystemStatus};
pub use state::SubsystemState;
pub use status::{Status, SubStatus};
pub use trivial::TrivialStatus;
