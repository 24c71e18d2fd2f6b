//! 看门狗线程：周期检查心跳，超时则把子系统标记为 Stalled

use crate::shared::Shared;
use gearbox_status::SubsystemState;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::trace;

pub(crate) fn spawn(shared: Arc<Shared>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("{}-watchdog", shared.name()))
        .spawn(move || run(&shared))
}

fn run(shared: &Shared) {
    let interval = shared.config.watchdog_interval();
    let threshold = shared.config.stall_threshold();
    let message = format!("No heartbeat for {} ms", shared.config.stall_threshold_ms);
    trace!("Watchdog for '{}' started", shared.name());

    // 子系统终止后退出
    while !shared.wait_until(Some(interval), |inner| inner.state.is_terminal()) {
        shared.transition_if(SubsystemState::Stalled, Some(&message), |inner| {
            matches!(
                inner.state,
                SubsystemState::Initializing | SubsystemState::Working
            ) && inner.heartbeat.has_elapsed(threshold)
        });
    }

    trace!("Watchdog for '{}' exited", shared.name());
}
