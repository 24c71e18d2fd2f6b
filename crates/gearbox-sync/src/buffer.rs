//! Buffer：线程安全的有界 FIFO 队列
//!
//! 容量可配置（包括无界），满时的行为由 [`BufferPolicy`] 决定：
//!
//! | 策略              | 满时 push 的行为                         |
//! |-------------------|-----------------------------------------|
//! | `Block`           | 阻塞生产者，直到有消费者取走元素           |
//! | `OverwriteOldest` | 丢弃最旧的元素，新元素入队（循环缓冲区）     |
//! | `DropNewest`      | 丢弃新元素，push 返回 `Rejected`          |
//!
//! # 所有权
//!
//! 与 `Store` 相同：`Buffer` 是所有者，其他线程使用 [`Buffer::handle`] 得到的
//! [`BufferHandle`]。所有者 drop 时清空队列并唤醒所有阻塞中的生产者/消费者，
//! 它们返回 `NotAvailable`。

use crate::error::{PushError, SyncError};
use crate::timer::Timer;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// 满时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BufferPolicy {
    /// 阻塞生产者（默认）
    #[default]
    Block,
    /// 覆盖最旧的元素
    OverwriteOldest,
    /// 丢弃新元素
    DropNewest,
}

/// Buffer 配置
///
/// `capacity == 0` 表示无界：push 总是成功，永不淘汰，策略不起作用。
///
/// # Example
///
/// ```
/// use gearbox_sync::{BufferConfig, BufferPolicy};
///
/// let config = BufferConfig::bounded(100, BufferPolicy::OverwriteOldest);
/// assert!(!config.is_unbounded());
///
/// let config = BufferConfig::unbounded();
/// assert!(config.is_unbounded());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BufferConfig {
    /// 最大元素个数（0 = 无界）
    pub capacity: usize,
    /// 满时的处理策略
    pub policy: BufferPolicy,
}

impl BufferConfig {
    /// 有界队列
    pub const fn bounded(capacity: usize, policy: BufferPolicy) -> Self {
        Self { capacity, policy }
    }

    /// 无界队列
    pub const fn unbounded() -> Self {
        Self {
            capacity: 0,
            policy: BufferPolicy::Block,
        }
    }

    /// 是否无界
    pub const fn is_unbounded(&self) -> bool {
        self.capacity == 0
    }
}

/// push 的结果
///
/// 被淘汰或被拒绝的元素会交还给调用方。
#[must_use = "a rejected item is returned to the caller"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome<T> {
    /// 已入队
    Accepted,
    /// 已入队，同时淘汰了最旧的元素（`OverwriteOldest`）
    Replaced(T),
    /// 未入队（`DropNewest` 且已满）
    Rejected(T),
}

impl<T> PushOutcome<T> {
    /// 新元素是否入队
    pub fn is_accepted(&self) -> bool {
        !matches!(self, PushOutcome::Rejected(_))
    }

    /// 是否有旧元素被淘汰
    pub fn is_evicted(&self) -> bool {
        matches!(self, PushOutcome::Replaced(_))
    }
}

struct BufferState<T> {
    queue: VecDeque<T>,
    config: BufferConfig,
    released: bool,
}

impl<T> BufferState<T> {
    fn is_full(&self) -> bool {
        !self.config.is_unbounded() && self.queue.len() >= self.config.capacity
    }
}

struct BufferShared<T> {
    state: Mutex<BufferState<T>>,
    /// 队列变为非空（唤醒 pop）
    not_empty: Condvar,
    /// 队列变为非空（唤醒所有 peek，peek 不消费，需要全部唤醒）
    readable: Condvar,
    /// 队列腾出空间（唤醒 Block 策略下的 push）
    not_full: Condvar,
}

impl<T> BufferShared<T> {
    fn new(config: BufferConfig) -> Self {
        Self {
            state: Mutex::new(BufferState {
                queue: VecDeque::new(),
                config,
                released: false,
            }),
            not_empty: Condvar::new(),
            readable: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// 等待队列非空
    ///
    /// 返回的 guard 中队列一定非空。
    fn wait_readable(
        &self,
        cond: &Condvar,
        timeout: Option<Duration>,
    ) -> Result<MutexGuard<'_, BufferState<T>>, SyncError> {
        let timer = Timer::new();
        let mut state = self.state.lock();
        loop {
            if state.released {
                return Err(SyncError::NotAvailable);
            }
            if !state.queue.is_empty() {
                return Ok(state);
            }
            match timeout {
                None => cond.wait(&mut state),
                Some(timeout) => {
                    let remaining = timer.remaining(timeout);
                    if remaining.is_zero() {
                        return Err(SyncError::Timeout);
                    }
                    cond.wait_for(&mut state, remaining);
                },
            }
        }
    }

    fn push(&self, item: T, timeout: Option<Duration>) -> Result<PushOutcome<T>, PushError<T>> {
        let timer = Timer::new();
        let mut state = self.state.lock();
        loop {
            if state.released {
                return Err(PushError::NotAvailable(item));
            }
            if !state.is_full() {
                break;
            }
            let policy = state.config.policy;
            match policy {
                BufferPolicy::OverwriteOldest => {
                    let evicted = state.queue.pop_front();
                    state.queue.push_back(item);
                    drop(state);
                    self.notify_readable();
                    return Ok(match evicted {
                        Some(old) => PushOutcome::Replaced(old),
                        None => PushOutcome::Accepted,
                    });
                },
                BufferPolicy::DropNewest => return Ok(PushOutcome::Rejected(item)),
                BufferPolicy::Block => match timeout {
                    None => self.not_full.wait(&mut state),
                    Some(timeout) => {
                        let remaining = timer.remaining(timeout);
                        if remaining.is_zero() {
                            return Err(PushError::Timeout(item));
                        }
                        self.not_full.wait_for(&mut state, remaining);
                    },
                },
            }
        }

        state.queue.push_back(item);
        drop(state);
        self.notify_readable();
        Ok(PushOutcome::Accepted)
    }

    fn notify_readable(&self) {
        self.not_empty.notify_one();
        self.readable.notify_all();
    }

    fn pop(&self, timeout: Option<Duration>) -> Result<T, SyncError> {
        let mut state = self.wait_readable(&self.not_empty, timeout)?;
        let item = state.queue.pop_front().ok_or(SyncError::NotAvailable)?;
        let more = !state.queue.is_empty();
        drop(state);
        self.not_full.notify_one();
        if more {
            // 可能有多个元素同时入队而只唤醒了一个消费者
            self.not_empty.notify_one();
        }
        Ok(item)
    }

    fn try_pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        let item = state.queue.pop_front();
        drop(state);
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    fn purge(&self) {
        self.state.lock().queue.clear();
        self.not_full.notify_all();
    }

    fn configure(&self, config: BufferConfig) {
        let mut state = self.state.lock();
        state.queue.clear();
        state.config = config;
        drop(state);
        self.not_full.notify_all();
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.released = true;
        let dropped = state.queue.len();
        state.queue.clear();
        trace!("Buffer released, dropping {} queued items", dropped);
        drop(state);
        self.not_empty.notify_all();
        self.readable.notify_all();
        self.not_full.notify_all();
    }

    fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    fn config(&self) -> BufferConfig {
        self.state.lock().config
    }

    fn is_released(&self) -> bool {
        self.state.lock().released
    }
}

impl<T: Clone> BufferShared<T> {
    fn peek(&self, timeout: Option<Duration>) -> Result<T, SyncError> {
        let state = self.wait_readable(&self.readable, timeout)?;
        state.queue.front().cloned().ok_or(SyncError::NotAvailable)
    }

    fn try_peek(&self) -> Option<T> {
        self.state.lock().queue.front().cloned()
    }
}

/// 线程安全的有界 FIFO 队列（所有者）
///
/// # Example
///
/// ```
/// use gearbox_sync::{Buffer, BufferConfig, BufferPolicy, PushOutcome};
///
/// let buffer = Buffer::new(BufferConfig::bounded(2, BufferPolicy::OverwriteOldest));
/// assert_eq!(buffer.push(1), Ok(PushOutcome::Accepted));
/// assert_eq!(buffer.push(2), Ok(PushOutcome::Accepted));
/// assert_eq!(buffer.push(3), Ok(PushOutcome::Replaced(1)));
///
/// assert_eq!(buffer.pop(), Ok(2));
/// assert_eq!(buffer.pop(), Ok(3));
/// assert!(buffer.is_empty());
/// ```
pub struct Buffer<T> {
    shared: Arc<BufferShared<T>>,
}

impl<T> Buffer<T> {
    /// 按配置创建空队列
    pub fn new(config: BufferConfig) -> Self {
        Self {
            shared: Arc::new(BufferShared::new(config)),
        }
    }

    /// 创建无界队列
    pub fn unbounded() -> Self {
        Self::new(BufferConfig::unbounded())
    }

    /// 创建可克隆的句柄，用于生产者/消费者线程
    pub fn handle(&self) -> BufferHandle<T> {
        BufferHandle {
            shared: self.shared.clone(),
        }
    }

    /// 按策略入队
    ///
    /// `Block` 策略下队列已满时阻塞，直到有空间。成功入队会唤醒一个阻塞中的 `pop`。
    ///
    /// # 错误
    /// - `PushError::NotAvailable`: 等待期间 Buffer 被释放（元素随错误返回）
    pub fn push(&self, item: T) -> Result<PushOutcome<T>, PushError<T>> {
        self.shared.push(item, None)
    }

    /// 带超时的 [`Buffer::push`]（只有 `Block` 策略会等待）
    pub fn push_timed(
        &self,
        item: T,
        timeout: Duration,
    ) -> Result<PushOutcome<T>, PushError<T>> {
        self.shared.push(item, Some(timeout))
    }

    /// 阻塞直到非空，取出最旧的元素
    ///
    /// # 错误
    /// - `SyncError::NotAvailable`: 等待期间 Buffer 被释放
    pub fn pop(&self) -> Result<T, SyncError> {
        self.shared.pop(None)
    }

    /// 带超时的 [`Buffer::pop`]
    ///
    /// 超时 0 且队列为空时立即返回 `SyncError::Timeout`。
    pub fn pop_timed(&self, timeout: Duration) -> Result<T, SyncError> {
        self.shared.pop(Some(timeout))
    }

    /// 非阻塞取出，队列为空时返回 `None`
    pub fn try_pop(&self) -> Option<T> {
        self.shared.try_pop()
    }

    /// 队列是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 当前元素个数
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// 清空队列，配置不变
    pub fn purge(&self) {
        self.shared.purge();
    }

    /// 替换配置，同时清空队列
    pub fn configure(&self, config: BufferConfig) {
        self.shared.configure(config);
    }

    /// 当前配置
    pub fn config(&self) -> BufferConfig {
        self.shared.config()
    }
}

impl<T: Clone> Buffer<T> {
    /// 读取最旧的元素但不取出（peek），阻塞语义与 [`Buffer::pop`] 相同
    pub fn get(&self) -> Result<T, SyncError> {
        self.shared.peek(None)
    }

    /// 带超时的 [`Buffer::get`]
    pub fn get_timed(&self, timeout: Duration) -> Result<T, SyncError> {
        self.shared.peek(Some(timeout))
    }

    /// 非阻塞 peek
    pub fn try_get(&self) -> Option<T> {
        self.shared.try_peek()
    }
}

impl<T> Drop for Buffer<T> {
    fn drop(&mut self) {
        self.shared.release();
    }
}

/// Buffer 的共享句柄
///
/// 提供与 [`Buffer`] 相同的读写操作（除 `configure` 外），可克隆后发送到任意线程。
/// Buffer 所有者 drop 之后，阻塞操作返回 `NotAvailable`，队列视为空。
pub struct BufferHandle<T> {
    shared: Arc<BufferShared<T>>,
}

impl<T> BufferHandle<T> {
    /// 见 [`Buffer::push`]
    pub fn push(&self, item: T) -> Result<PushOutcome<T>, PushError<T>> {
        self.shared.push(item, None)
    }

    /// 见 [`Buffer::push_timed`]
    pub fn push_timed(
        &self,
        item: T,
        timeout: Duration,
    ) -> Result<PushOutcome<T>, PushError<T>> {
        self.shared.push(item, Some(timeout))
    }

    /// 见 [`Buffer::pop`]
    pub fn pop(&self) -> Result<T, SyncError> {
        self.shared.pop(None)
    }

    /// 见 [`Buffer::pop_timed`]
    pub fn pop_timed(&self, timeout: Duration) -> Result<T, SyncError> {
        self.shared.pop(Some(timeout))
    }

    /// 见 [`Buffer::try_pop`]
    pub fn try_pop(&self) -> Option<T> {
        self.shared.try_pop()
    }

    /// 队列是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 当前元素个数
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// 清空队列
    pub fn purge(&self) {
        self.shared.purge();
    }

    /// 当前配置
    pub fn config(&self) -> BufferConfig {
        self.shared.config()
    }

    /// Buffer 所有者是否已经 drop
    pub fn is_released(&self) -> bool {
        self.shared.is_released()
    }
}

impl<T: Clone> BufferHandle<T> {
    /// 见 [`Buffer::get`]
    pub fn get(&self) -> Result<T, SyncError> {
        self.shared.peek(None)
    }

    /// 见 [`Buffer::get_timed`]
    pub fn get_timed(&self, timeout: Duration) -> Result<T, SyncError> {
        self.shared.peek(Some(timeout))
    }

    /// 见 [`Buffer::try_get`]
    pub fn try_get(&self) -> Option<T> {
        self.shared.try_peek()
    }
}

impl<T> Clone for BufferHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}
