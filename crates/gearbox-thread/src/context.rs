//! 工作体使用的上下文句柄

use crate::config::StallDetection;
use crate::shared::Shared;
use gearbox_status::SubsystemState;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// 传给工作体的上下文
///
/// 工作体通过它观察停止请求、上报心跳与状态。
/// 典型的轮询循环：
///
/// ```
/// use gearbox_thread::SubsystemThread;
/// use std::time::Duration;
///
/// let thread = SubsystemThread::builder("poller")
///     .spawn(|ctx| {
///         ctx.working("polling");
///         while ctx.checked_sleep(Duration::from_millis(5)) {
///             ctx.heartbeat();
///         }
///         Ok(())
///     })
///     .unwrap();
///
/// thread.stop_and_join().unwrap();
/// ```
pub struct SubsystemContext {
    shared: Arc<Shared>,
}

impl SubsystemContext {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    pub fn name(&self) -> &str {
        self.shared.name()
    }

    /// 当前状态
    pub fn state(&self) -> SubsystemState {
        self.shared.state()
    }

    /// 所有者是否已请求停止
    ///
    /// 工作体应在每个安全点检查，返回 `true` 后尽快退出。
    pub fn is_stopping(&self) -> bool {
        self.shared.is_stopping()
    }

    /// 上报心跳
    ///
    /// Initializing/Stalled 状态下会转为 Working，否则只刷新心跳计时。
    /// 说明文字保持不变；从 Stalled 恢复时清除卡顿说明。
    pub fn heartbeat(&self) {
        self.shared.touch();
        if !self.shared.transition(SubsystemState::Working, None) {
            self.shared.publish_heartbeat();
        }
    }

    /// 进入（或保持）Working 并更新说明
    pub fn working(&self, message: &str) {
        self.shared.touch();
        if !self.shared.transition(SubsystemState::Working, Some(message)) {
            self.shared.update_message(message);
        }
    }

    /// 更新说明，状态不变
    pub fn set_message(&self, message: &str) {
        self.shared.update_message(message);
    }

    /// 主动上报卡顿
    ///
    /// 关闭卡顿检测时忽略。返回是否真的进入了 Stalled。
    pub fn report_stalled(&self, message: &str) -> bool {
        if self.shared.config.stall_detection == StallDetection::Disabled {
            debug!(
                "Subsystem '{}' reported a stall with detection disabled: {}",
                self.name(),
                message
            );
            return false;
        }
        self.shared
            .transition(SubsystemState::Stalled, Some(message))
    }

    /// 可被停止请求打断的睡眠
    ///
    /// 睡满 `duration` 返回 `true`；收到停止请求立即返回 `false`。
    pub fn checked_sleep(&self, duration: Duration) -> bool {
        !self
            .shared
            .wait_until(Some(duration), |inner| inner.stop_requested)
    }

    /// 阻塞直到收到停止请求
    pub fn wait_for_stop(&self) {
        self.shared.wait_until(None, |inner| inner.stop_requested);
    }
}

impl std::fmt::Debug for SubsystemContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubsystemContext")
            .field("name", &self.name())
            .finish()
    }
}
