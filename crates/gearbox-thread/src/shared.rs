//! 工作线程、看门狗与所有者之间共享的生命周期状态
//!
//! 锁顺序：`publish` → `inner`。向 `Status` 上报时只持有 `publish`，
//! 不持有 `inner`，因此 `Status` 实现即使回调查询状态也不会死锁。

use crate::config::SubsystemConfig;
use crate::error::ThreadError;
use gearbox_status::{Status, SubStatus, SubsystemState};
use gearbox_sync::{SyncError, Timer};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub(crate) struct Inner {
    pub(crate) state: SubsystemState,
    pub(crate) message: String,
    /// 上次心跳时间
    pub(crate) heartbeat: Timer,
    pub(crate) started: bool,
    pub(crate) stop_requested: bool,
}

pub(crate) struct Shared {
    pub(crate) config: SubsystemConfig,
    status: SubStatus,
    inner: Mutex<Inner>,
    /// 状态变化或停止请求时 notify_all
    changed: Condvar,
    /// 串行化上报，保证 Status 看到的顺序与转移顺序一致
    publish: Mutex<()>,
}

impl Shared {
    pub(crate) fn new(name: String, status: Arc<dyn Status>, config: SubsystemConfig) -> Self {
        let status = SubStatus::new(status, name, config.max_heartbeat_interval());
        status.set_state(&SubsystemState::Initializing, "");
        Self {
            config,
            status,
            inner: Mutex::new(Inner {
                state: SubsystemState::Initializing,
                message: String::new(),
                heartbeat: Timer::new(),
                started: false,
                stop_requested: false,
            }),
            changed: Condvar::new(),
            publish: Mutex::new(()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        self.status.name()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock()
    }

    pub(crate) fn state(&self) -> SubsystemState {
        self.lock().state.clone()
    }

    pub(crate) fn message(&self) -> String {
        self.lock().message.clone()
    }

    pub(crate) fn is_started(&self) -> bool {
        self.lock().started
    }

    pub(crate) fn is_stopping(&self) -> bool {
        self.lock().stop_requested
    }

    /// 标记为已启动，并从此刻开始计算心跳
    ///
    /// 启动前已经请求停止时，直接进入 ShuttingDown。
    pub(crate) fn mark_started(&self) {
        let _publish = self.publish.lock();
        let message = {
            let mut inner = self.lock();
            inner.started = true;
            inner.heartbeat.restart();
            if !inner.stop_requested
                || !Self::enter(&mut *inner, SubsystemState::ShuttingDown, None)
            {
                return;
            }
            self.changed.notify_all();
            inner.message.clone()
        };
        self.announce(&SubsystemState::ShuttingDown, &message);
    }

    /// 在已持有 `inner` 的情况下执行转移，非法转移返回 false
    fn enter(inner: &mut Inner, next: SubsystemState, message: Option<&str>) -> bool {
        if !inner.state.can_transition_to(&next) {
            return false;
        }
        match message {
            Some(message) => inner.message = message.to_string(),
            // 离开 Stalled 后卡顿说明不再成立
            None if inner.state == SubsystemState::Stalled => inner.message.clear(),
            None => {},
        }
        if next == SubsystemState::Working {
            inner.heartbeat.restart();
        }
        inner.state = next;
        true
    }

    /// 记录日志并上报给 Status（调用方持有 `publish`）
    fn announce(&self, next: &SubsystemState, message: &str) {
        match next {
            SubsystemState::Fault(reason) => {
                error!("Subsystem '{}' entered Fault: {}", self.name(), reason)
            },
            SubsystemState::Stalled => {
                warn!("Subsystem '{}' stalled: {}", self.name(), message)
            },
            state => debug!("Subsystem '{}' -> {}", self.name(), state),
        }
        self.status.set_state(next, message);
    }

    /// 条件状态转移
    ///
    /// `guard` 与转移表检查在同一次加锁内完成；成功时唤醒所有等待者并上报。
    pub(crate) fn transition_if(
        &self,
        next: SubsystemState,
        message: Option<&str>,
        guard: impl FnOnce(&Inner) -> bool,
    ) -> bool {
        let _publish = self.publish.lock();
        let message = {
            let mut inner = self.lock();
            if !guard(&*inner) || !Self::enter(&mut *inner, next.clone(), message) {
                return false;
            }
            self.changed.notify_all();
            inner.message.clone()
        };
        self.announce(&next, &message);
        true
    }

    pub(crate) fn transition(&self, next: SubsystemState, message: Option<&str>) -> bool {
        self.transition_if(next, message, |_| true)
    }

    pub(crate) fn fault(&self, reason: String) -> bool {
        self.transition(SubsystemState::Fault(reason.clone()), Some(&reason))
    }

    /// 更新说明文字（状态不变）并上报
    pub(crate) fn update_message(&self, message: &str) {
        let _publish = self.publish.lock();
        let state = {
            let mut inner = self.lock();
            inner.message = message.to_string();
            inner.state.clone()
        };
        self.status.set_state(&state, message);
    }

    /// 刷新心跳计时
    pub(crate) fn touch(&self) {
        self.lock().heartbeat.restart();
    }

    pub(crate) fn publish_heartbeat(&self) {
        self.status.heartbeat();
    }

    /// 设置停止标志；已启动且未终止时进入 ShuttingDown
    ///
    /// 标志与状态在同一次加锁内修改，并在上报前一直持有 `publish`，
    /// 工作体看到停止标志后上报的 Finished 一定排在 ShuttingDown 之后。
    pub(crate) fn request_stop(&self) {
        let _publish = self.publish.lock();
        let message = {
            let mut inner = self.lock();
            inner.stop_requested = true;
            self.changed.notify_all();
            if !inner.started
                || !Self::enter(&mut *inner, SubsystemState::ShuttingDown, None)
            {
                return;
            }
            inner.message.clone()
        };
        self.announce(&SubsystemState::ShuttingDown, &message);
    }

    /// 等待 `done` 成立
    ///
    /// 返回 `false` 表示超时。`timeout = None` 时一直等待。
    pub(crate) fn wait_until(
        &self,
        timeout: Option<Duration>,
        mut done: impl FnMut(&Inner) -> bool,
    ) -> bool {
        let timer = Timer::new();
        let mut inner = self.lock();
        loop {
            if done(&*inner) {
                return true;
            }
            match timeout {
                None => self.changed.wait(&mut inner),
                Some(timeout) => {
                    let remaining = timer.remaining(timeout);
                    if remaining.is_zero() {
                        return false;
                    }
                    self.changed.wait_for(&mut inner, remaining);
                },
            }
        }
    }

    /// 等待进入终止状态，返回该状态
    pub(crate) fn wait_terminal(
        &self,
        timeout: Option<Duration>,
    ) -> Result<SubsystemState, ThreadError> {
        if !self.is_started() {
            return Err(ThreadError::InvalidState("subsystem thread not started"));
        }
        if !self.wait_until(timeout, |inner| inner.state.is_terminal()) {
            return Err(SyncError::Timeout.into());
        }
        Ok(self.state())
    }
}
