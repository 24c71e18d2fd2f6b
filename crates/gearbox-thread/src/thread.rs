//! SubsystemThread：带生命周期与健康状态的受管工作线程
//!
//! 工作体在独立的系统线程中运行，所有状态转移都会上报给注入的 [`Status`]。
//! 工作体返回 `Err` 或 panic 时，在线程边界被捕获并转为终止状态 `Fault`，
//! 不会影响进程中的其他线程。

use crate::config::{StallDetection, SubsystemConfig};
use crate::context::SubsystemContext;
use crate::error::ThreadError;
use crate::shared::Shared;
use crate::watchdog;
use gearbox_status::{Status, SubsystemState, TrivialStatus};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error};

/// 工作体 Trait
///
/// 闭包 `FnMut(&SubsystemContext) -> anyhow::Result<()>` 自动实现此 Trait；
/// 需要持有设备句柄等状态时，也可以为自定义结构体实现。
pub trait Subsystem: Send + 'static {
    /// 运行工作体，直到完成或观察到停止请求
    fn run(&mut self, ctx: &SubsystemContext) -> anyhow::Result<()>;
}

impl<F> Subsystem for F
where
    F: FnMut(&SubsystemContext) -> anyhow::Result<()> + Send + 'static,
{
    fn run(&mut self, ctx: &SubsystemContext) -> anyhow::Result<()> {
        self(ctx)
    }
}

/// 受管工作线程
///
/// # 生命周期
///
/// - `start()` 只能调用一次，重复调用返回 [`ThreadError::InvalidState`]
/// - `stop()` 设置停止标志并进入 ShuttingDown，可重复调用
/// - `join()` 阻塞直到 Finished 或 Fault
/// - drop 时自动 `stop()`，并在 `shutdown_timeout_ms` 内等待线程退出
///
/// # Example
///
/// ```
/// use gearbox_status::{LocalStatus, SubsystemState};
/// use gearbox_thread::SubsystemThread;
/// use std::sync::Arc;
///
/// let status = Arc::new(LocalStatus::new());
/// let thread = SubsystemThread::builder("counter")
///     .status(status.clone())
///     .build(|ctx| {
///         for _ in 0..3 {
///             ctx.heartbeat();
///         }
///         Ok(())
///     })
///     .unwrap();
///
/// thread.start().unwrap();
/// thread.join().unwrap();
/// assert_eq!(thread.state(), SubsystemState::Finished);
/// ```
pub struct SubsystemThread {
    shared: Arc<Shared>,
    body: Mutex<Option<Box<dyn Subsystem>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    watchdog: Mutex<Option<JoinHandle<()>>>,
}

impl SubsystemThread {
    /// 使用默认配置创建（尚未启动）
    pub fn new<F>(name: impl Into<String>, status: Arc<dyn Status>, body: F) -> Self
    where
        F: FnMut(&SubsystemContext) -> anyhow::Result<()> + Send + 'static,
    {
        Self::from_parts(name.into(), status, SubsystemConfig::default(), Box::new(body))
    }

    /// 创建 Builder
    pub fn builder(name: impl Into<String>) -> SubsystemThreadBuilder {
        SubsystemThreadBuilder::new(name)
    }

    fn from_parts(
        name: String,
        status: Arc<dyn Status>,
        config: SubsystemConfig,
        body: Box<dyn Subsystem>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared::new(name, status, config)),
            body: Mutex::new(Some(body)),
            worker: Mutex::new(None),
            watchdog: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        self.shared.name()
    }

    pub fn config(&self) -> &SubsystemConfig {
        &self.shared.config
    }

    /// 当前状态
    pub fn state(&self) -> SubsystemState {
        self.shared.state()
    }

    /// 最近一次上报的说明
    pub fn message(&self) -> String {
        self.shared.message()
    }

    pub fn is_started(&self) -> bool {
        self.shared.is_started()
    }

    pub fn is_stopping(&self) -> bool {
        self.shared.is_stopping()
    }

    /// 启动工作线程
    ///
    /// 看门狗模式下同时启动看门狗线程。
    pub fn start(&self) -> Result<(), ThreadError> {
        let body = self
            .body
            .lock()
            .take()
            .ok_or(ThreadError::InvalidState("subsystem thread already started"))?;
        self.shared.mark_started();

        if self.shared.config.stall_detection == StallDetection::Watchdog {
            match watchdog::spawn(self.shared.clone()) {
                Ok(handle) => *self.watchdog.lock() = Some(handle),
                Err(e) => {
                    self.shared
                        .fault(format!("Failed to spawn watchdog thread: {}", e));
                    return Err(ThreadError::Spawn(e));
                },
            }
        }

        let shared = self.shared.clone();
        let spawned = thread::Builder::new()
            .name(self.name().to_string())
            .spawn(move || run_body(shared, body));
        match spawned {
            Ok(handle) => {
                *self.worker.lock() = Some(handle);
                Ok(())
            },
            Err(e) => {
                self.shared.fault(format!("Failed to spawn thread: {}", e));
                Err(ThreadError::Spawn(e))
            },
        }
    }

    /// 请求停止（幂等）
    pub fn stop(&self) {
        self.shared.request_stop();
    }

    /// 等待线程结束
    ///
    /// Finished 返回 `Ok(())`，Fault 返回 [`ThreadError::Fault`]。
    pub fn join(&self) -> Result<(), ThreadError> {
        let state = self.shared.wait_terminal(None)?;
        self.reap();
        terminal_result(state)
    }

    /// 带超时的 `join`，超时返回 `ThreadError::Sync(SyncError::Timeout)`
    pub fn join_timeout(&self, timeout: Duration) -> Result<(), ThreadError> {
        let state = self.shared.wait_terminal(Some(timeout))?;
        self.reap();
        terminal_result(state)
    }

    /// `stop()` 后 `join()`
    pub fn stop_and_join(&self) -> Result<(), ThreadError> {
        self.stop();
        self.join()
    }

    /// 回收已经终止的系统线程
    fn reap(&self) {
        let worker = self.worker.lock().take();
        if let Some(handle) = worker
            && handle.join().is_err()
        {
            error!("Subsystem '{}' worker thread panicked outside its body", self.name());
        }

        let watchdog = self.watchdog.lock().take();
        if let Some(handle) = watchdog
            && handle.join().is_err()
        {
            error!("Subsystem '{}' watchdog thread panicked", self.name());
        }
    }
}

impl Drop for SubsystemThread {
    fn drop(&mut self) {
        if !self.is_started() {
            return;
        }
        self.stop();

        let timeout = self.shared.config.shutdown_timeout();
        match self.shared.wait_terminal(Some(timeout)) {
            Ok(_) => self.reap(),
            Err(_) => error!(
                "Subsystem '{}' failed to shut down within {:?}, detaching thread",
                self.name(),
                timeout
            ),
        }
    }
}

impl std::fmt::Debug for SubsystemThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubsystemThread")
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}

fn terminal_result(state: SubsystemState) -> Result<(), ThreadError> {
    match state {
        SubsystemState::Fault(reason) => Err(ThreadError::Fault(reason)),
        _ => Ok(()),
    }
}

fn run_body(shared: Arc<Shared>, mut body: Box<dyn Subsystem>) {
    debug!("Subsystem '{}' thread started", shared.name());
    let ctx = SubsystemContext::new(shared.clone());

    match panic::catch_unwind(AssertUnwindSafe(|| body.run(&ctx))) {
        Ok(Ok(())) => {
            shared.transition(SubsystemState::Finished, None);
        },
        // {:#} 带上完整的 context 链
        Ok(Err(e)) => {
            shared.fault(format!("{:#}", e));
        },
        Err(payload) => {
            shared.fault(format!("panicked: {}", panic_message(payload.as_ref())));
        },
    }

    debug!("Subsystem '{}' thread exited", shared.name());
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}

/// SubsystemThread Builder（链式构造）
///
/// ```
/// use gearbox_thread::{StallDetection, SubsystemConfig, SubsystemThread};
///
/// let config = SubsystemConfig {
///     stall_detection: StallDetection::SelfReported,
///     ..SubsystemConfig::default()
/// };
/// let thread = SubsystemThread::builder("gps")
///     .config(config)
///     .spawn(|ctx| {
///         ctx.wait_for_stop();
///         Ok(())
///     })
///     .unwrap();
/// thread.stop_and_join().unwrap();
/// ```
pub struct SubsystemThreadBuilder {
    name: String,
    status: Option<Arc<dyn Status>>,
    config: SubsystemConfig,
}

impl SubsystemThreadBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: None,
            config: SubsystemConfig::default(),
        }
    }

    /// 状态上报协作者（默认 [`TrivialStatus`]）
    pub fn status(mut self, status: Arc<dyn Status>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn config(mut self, config: SubsystemConfig) -> Self {
        self.config = config;
        self
    }

    /// 以闭包为工作体构造（不启动）
    pub fn build<F>(self, body: F) -> Result<SubsystemThread, ThreadError>
    where
        F: FnMut(&SubsystemContext) -> anyhow::Result<()> + Send + 'static,
    {
        self.build_subsystem(body)
    }

    /// 以实现了 [`Subsystem`] 的类型为工作体构造（不启动）
    pub fn build_subsystem<S: Subsystem>(self, body: S) -> Result<SubsystemThread, ThreadError> {
        if self.name.is_empty() || self.name.contains('\0') {
            return Err(ThreadError::Config(format!(
                "invalid subsystem name {:?}",
                self.name
            )));
        }
        self.config.validate()?;

        let status = self
            .status
            .unwrap_or_else(|| Arc::new(TrivialStatus::default()));
        Ok(SubsystemThread::from_parts(
            self.name,
            status,
            self.config,
            Box::new(body),
        ))
    }

    /// 构造并立即启动
    pub fn spawn<F>(self, body: F) -> Result<SubsystemThread, ThreadError>
    where
        F: FnMut(&SubsystemContext) -> anyhow::Result<()> + Send + 'static,
    {
        let thread = self.build(body)?;
        thread.start()?;
        Ok(thread)
    }
}
