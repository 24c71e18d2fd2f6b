//! 集成测试共用工具

#![allow(dead_code)]

use gearbox_sdk::{Status, SubsystemState};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// 记录每一次上报的 Status
#[derive(Default)]
pub struct RecordingStatus {
    events: Mutex<Vec<(String, SubsystemState, String)>>,
}

impl RecordingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 某个子系统收到的状态序列
    pub fn states_of(&self, subsystem: &str) -> Vec<SubsystemState> {
        self.events
            .lock()
            .iter()
            .filter(|(name, _, _)| name == subsystem)
            .map(|(_, state, _)| state.clone())
            .collect()
    }

    pub fn faults_of(&self, subsystem: &str) -> Vec<String> {
        self.states_of(subsystem)
            .into_iter()
            .filter_map(|state| match state {
                SubsystemState::Fault(reason) => Some(reason),
                _ => None,
            })
            .collect()
    }
}

impl Status for RecordingStatus {
    fn set_state(&self, subsystem: &str, state: &SubsystemState, message: &str) {
        self.events
            .lock()
            .push((subsystem.to_string(), state.clone(), message.to_string()));
    }
}

/// 轮询等待条件成立，超时返回 false
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}
