//! TrivialStatus：只记录日志的 Status 实现

use crate::state::SubsystemState;
use crate::status::Status;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 不保存任何状态，所有变化写入 `tracing` 日志
///
/// 日志级别按状态区分：
/// - `Fault` → `error!`
/// - `Stalled` → `warn!`
/// - 其他状态 → `info!`（可通过 `with_state_changes(false)` 关闭）
/// - 心跳 → `debug!`（默认关闭）
#[derive(Debug, Clone, Copy)]
pub struct TrivialStatus {
    trace_state_changes: bool,
    trace_heartbeats: bool,
}

impl TrivialStatus {
    /// 默认配置：记录状态变化，不记录心跳
    pub const fn new() -> Self {
        Self {
            trace_state_changes: true,
            trace_heartbeats: false,
        }
    }

    /// 是否记录普通状态变化（Fault/Stalled 总是记录）
    pub const fn with_state_changes(mut self, enabled: bool) -> Self {
        self.trace_state_changes = enabled;
        self
    }

    /// 是否记录心跳
    pub const fn with_heartbeats(mut self, enabled: bool) -> Self {
        self.trace_heartbeats = enabled;
        self
    }
}

impl Default for TrivialStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl Status for TrivialStatus {
    fn add_subsystem(&self, subsystem: &str, max_heartbeat_interval: Option<Duration>) {
        debug!(
            "Adding subsystem '{}' (max heartbeat interval: {:?})",
            subsystem, max_heartbeat_interval
        );
    }

    fn remove_subsystem(&self, subsystem: &str) {
        debug!("Removing subsystem '{}'", subsystem);
    }

    fn set_state(&self, subsystem: &str, state: &SubsystemState, message: &str) {
        match state {
            SubsystemState::Fault(reason) => {
                error!("Subsystem '{}' fault: {}", subsystem, reason);
            },
            SubsystemState::Stalled => {
                warn!("Subsystem '{}' stalled: {}", subsystem, message);
            },
            _ if self.trace_state_changes => {
                if message.is_empty() {
                    info!("Subsystem '{}' changed state to {}", subsystem, state);
                } else {
                    info!(
                        "Subsystem '{}' changed state to {}: '{}'",
                        subsystem, state, message
                    );
                }
            },
            _ => {},
        }
    }

    fn heartbeat(&self, subsystem: &str) {
        if self.trace_heartbeats {
            debug!("Heartbeat from subsystem '{}'", subsystem);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_flags() {
        let status = TrivialStatus::new()
            .with_state_changes(false)
            .with_heartbeats(true);
        assert!(!status.trace_state_changes);
        assert!(status.trace_heartbeats);
    }

    #[test]
    fn test_reporting_never_panics() {
        // 未安装 subscriber 时也应当正常工作
        let status = TrivialStatus::default();
        status.add_subsystem("laser", Some(Duration::from_secs(1)));
        status.set_state("laser", &SubsystemState::Working, "");
        status.set_state("laser", &SubsystemState::Stalled, "no data");
        status.set_state("laser", &SubsystemState::Fault("io".into()), "io");
        status.heartbeat("laser");
        status.remove_subsystem("laser");
    }
}
