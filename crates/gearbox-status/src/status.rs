//! 状态上报接口
//!
//! `Status` 是外部协作者：工作线程通过它上报状态变化，外部工具据此监控，
//! 无需直接读取线程内部状态。一个 `Status` 实例通常被进程内所有子系统共享，
//! 实现必须是线程安全的。

use crate::state::SubsystemState;
use std::sync::Arc;
use std::time::Duration;

/// 状态上报协作者 Trait
///
/// # 调用约定
///
/// - 子系统先调用 `add_subsystem` 注册，再上报状态
/// - 每次状态转移调用一次 `set_state`（名称、新状态、说明）
/// - `heartbeat` 表示子系统仍然存活，但状态不变
///
/// # 实现要求
///
/// 调用方可能在任意线程调用，且不持有任何内部锁。
/// 实现不应阻塞过久，否则会拖慢上报线程。
///
/// # 示例
///
/// ```rust
/// use gearbox_status::{Status, SubsystemState};
/// use std::sync::Mutex;
///
/// #[derive(Default)]
/// struct PrintStatus {
///     lines: Mutex<Vec<String>>,
/// }
///
/// impl Status for PrintStatus {
///     fn set_state(&self, subsystem: &str, state: &SubsystemState, message: &str) {
///         self.lines
///             .lock()
///             .unwrap()
///             .push(format!("{}: {} {}", subsystem, state, message));
///     }
/// }
///
/// let status = PrintStatus::default();
/// status.set_state("laser", &SubsystemState::Working, "");
/// assert_eq!(status.lines.lock().unwrap().len(), 1);
/// ```
pub trait Status: Send + Sync {
    /// 注册子系统
    ///
    /// `max_heartbeat_interval` 为期望的最大心跳间隔，`None` 表示不检测。
    /// 默认实现：不处理。
    fn add_subsystem(&self, subsystem: &str, max_heartbeat_interval: Option<Duration>) {
        let _ = (subsystem, max_heartbeat_interval);
    }

    /// 注销子系统（默认：不处理）
    ///
    /// 同名子系统可能注册多次，每次调用只抵消一次 `add_subsystem`。
    fn remove_subsystem(&self, subsystem: &str) {
        let _ = subsystem;
    }

    /// 上报状态转移
    fn set_state(&self, subsystem: &str, state: &SubsystemState, message: &str);

    /// 上报心跳，状态不变（默认：不处理）
    fn heartbeat(&self, subsystem: &str) {
        let _ = subsystem;
    }
}

/// 单个子系统的状态上报句柄
///
/// 绑定子系统名称与共享的 `Status`：创建时注册，drop 时注销。
///
/// # Example
///
/// ```
/// use gearbox_status::{LocalStatus, Status, SubStatus, SubsystemState};
/// use std::sync::Arc;
///
/// let status = Arc::new(LocalStatus::new());
/// {
///     let sub = SubStatus::new(status.clone(), "gps", None);
///     sub.set_state(&SubsystemState::Working, "fix acquired");
///     assert_eq!(status.subsystems(), vec!["gps".to_string()]);
/// }
/// // drop 后自动注销
/// assert!(status.subsystems().is_empty());
/// ```
pub struct SubStatus {
    status: Arc<dyn Status>,
    name: String,
}

impl SubStatus {
    /// 注册子系统并返回句柄
    pub fn new(
        status: Arc<dyn Status>,
        name: impl Into<String>,
        max_heartbeat_interval: Option<Duration>,
    ) -> Self {
        let name = name.into();
        status.add_subsystem(&name, max_heartbeat_interval);
        Self { status, name }
    }

    /// 子系统名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 共享的 Status 实例
    pub fn status(&self) -> &Arc<dyn Status> {
        &self.status
    }

    /// 上报状态转移
    pub fn set_state(&self, state: &SubsystemState, message: &str) {
        self.status.set_state(&self.name, state, message);
    }

    /// 上报心跳
    pub fn heartbeat(&self) {
        self.status.heartbeat(&self.name);
    }
}

impl Drop for SubStatus {
    fn drop(&mut self) {
        self.status.remove_subsystem(&self.name);
    }
}

impl std::fmt::Debug for SubStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubStatus").field("name", &self.name).finish()
    }
}
