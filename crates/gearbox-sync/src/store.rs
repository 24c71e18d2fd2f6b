//! Store：线程安全的单槽邮箱
//!
//! 保存最近一次写入的值。与容量为 1 的循环缓冲区类似，但有两点不同：
//! - 数据一旦写入就一直可读（读取不会取走数据）
//! - 每次写入都会递增版本号，读者凭版本号判断“是否有新数据”
//!
//! # 版本号而不是“新数据”标志
//!
//! 多个读者各自记住自己看到的最后版本（`Version`），互不干扰。
//! 用一个布尔标志的话，某个读者读取后会把标志清掉，其他读者就错过了这次更新。
//!
//! # 所有权
//!
//! ```text
//! ┌──────────────┐        ┌──────────────────┐
//! │  Store<T>    │──Arc──▶│  StoreShared<T>  │◀──Arc──  StoreReader<T> (Clone)
//! │  (写入/所有者) │        │  Mutex + Condvar │◀──Arc──  StoreCursor<T>
//! └──────────────┘        └──────────────────┘
//! ```
//!
//! `Store` drop 时标记为已释放并唤醒所有等待者，它们返回 `SyncError::NotAvailable`。

use crate::error::SyncError;
use crate::timer::Timer;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// 写入版本号
///
/// 不透明的单调递增令牌。`Version::NONE` 表示“还没看到过任何数据”，
/// 作为 `get_next` 的初始参数使用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version(u64);

impl Version {
    /// 尚未观察到任何写入
    pub const NONE: Version = Version(0);

    /// 原始计数值
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

struct StoreState<T> {
    value: Option<T>,
    /// 每次 `set` 加一，`purge` 不回退
    version: u64,
    released: bool,
}

struct StoreShared<T> {
    state: Mutex<StoreState<T>>,
    updated: Condvar,
}

impl<T> StoreShared<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                value: None,
                version: 0,
                released: false,
            }),
            updated: Condvar::new(),
        }
    }

    /// 等待直到 `ready` 成立、超时或 Store 被释放
    ///
    /// 每次唤醒后都重新检查条件，虚假唤醒不会返回旧数据。
    /// `timeout` 为 `None` 时无限等待。
    fn wait_until(
        &self,
        timeout: Option<Duration>,
        ready: impl Fn(&StoreState<T>) -> bool,
    ) -> Result<MutexGuard<'_, StoreState<T>>, SyncError> {
        let timer = Timer::new();
        let mut state = self.state.lock();
        loop {
            if state.released {
                return Err(SyncError::NotAvailable);
            }
            if ready(&*state) {
                return Ok(state);
            }
            match timeout {
                None => self.updated.wait(&mut state),
                Some(timeout) => {
                    let remaining = timer.remaining(timeout);
                    if remaining.is_zero() {
                        return Err(SyncError::Timeout);
                    }
                    self.updated.wait_for(&mut state, remaining);
                },
            }
        }
    }

    fn set(&self, value: T) -> Version {
        let mut state = self.state.lock();
        state.value = Some(value);
        state.version += 1;
        let version = Version(state.version);
        drop(state);
        self.updated.notify_all();
        version
    }

    fn purge(&self) {
        self.state.lock().value = None;
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.released = true;
        state.value = None;
        trace!("Store released at version {}", state.version);
        drop(state);
        self.updated.notify_all();
    }

    fn is_empty(&self) -> bool {
        self.state.lock().value.is_none()
    }

    fn is_released(&self) -> bool {
        self.state.lock().released
    }

    fn version(&self) -> Version {
        Version(self.state.lock().version)
    }
}

impl<T: Clone> StoreShared<T> {
    fn get(&self, timeout: Option<Duration>) -> Result<T, SyncError> {
        let state = self.wait_until(timeout, |s| s.value.is_some())?;
        state.value.clone().ok_or(SyncError::NotAvailable)
    }

    fn get_next(
        &self,
        last_seen: Version,
        timeout: Option<Duration>,
    ) -> Result<(T, Version), SyncError> {
        let state = self.wait_until(timeout, |s| {
            s.version > last_seen.0 && s.value.is_some()
        })?;
        let value = state.value.clone().ok_or(SyncError::NotAvailable)?;
        Ok((value, Version(state.version)))
    }

    fn try_get(&self) -> Option<(T, Version)> {
        let state = self.state.lock();
        if state.released {
            return None;
        }
        state
            .value
            .clone()
            .map(|value| (value, Version(state.version)))
    }
}

/// 线程安全的单槽邮箱（所有者/写入端）
///
/// # 线程安全
///
/// 所有方法都只在检查/修改内部状态期间持锁；多个写线程可以通过
/// `Arc<Store<T>>` 共享同一个 Store，读线程使用 [`Store::reader`] 得到的句柄。
///
/// # Example
///
/// ```
/// use gearbox_sync::{Store, Version};
/// use std::thread;
///
/// let store = Store::new();
/// let reader = store.reader();
///
/// let consumer = thread::spawn(move || reader.get_next(Version::NONE));
/// store.set(3.5_f64);
///
/// let (value, version) = consumer.join().unwrap().unwrap();
/// assert_eq!(value, 3.5);
/// assert!(version > Version::NONE);
/// ```
pub struct Store<T> {
    shared: Arc<StoreShared<T>>,
}

impl<T> Store<T> {
    /// 创建空的 Store
    pub fn new() -> Self {
        Self {
            shared: Arc::new(StoreShared::new()),
        }
    }

    /// 写入新值，版本号加一，唤醒所有等待中的读者
    ///
    /// 永不阻塞（除了短暂的内部加锁）。返回本次写入的版本号。
    pub fn set(&self, value: T) -> Version {
        self.shared.set(value)
    }

    /// 从未写入（或已 `purge`）时返回 true
    pub fn is_empty(&self) -> bool {
        self.shared.is_empty()
    }

    /// 清空数据
    ///
    /// 版本号保持不变，之后的写入继续从当前值递增。
    pub fn purge(&self) {
        self.shared.purge();
    }

    /// 当前版本号（最后一次写入的版本）
    pub fn version(&self) -> Version {
        self.shared.version()
    }

    /// 创建只读句柄（可克隆，可发送到其他线程）
    pub fn reader(&self) -> StoreReader<T> {
        StoreReader {
            shared: self.shared.clone(),
        }
    }

    /// 创建读游标，自动记录已读版本
    pub fn cursor(&self) -> StoreCursor<T> {
        self.reader().into_cursor()
    }
}

impl<T: Clone> Store<T> {
    /// 读取当前值
    ///
    /// 如果从未写入过，阻塞直到有数据。
    ///
    /// # 错误
    /// - `SyncError::NotAvailable`: 等待期间 Store 被释放
    pub fn get(&self) -> Result<T, SyncError> {
        self.shared.get(None)
    }

    /// 带超时的 [`Store::get`]
    ///
    /// 超时 0 且无数据时立即返回 `SyncError::Timeout`。
    pub fn get_timed(&self, timeout: Duration) -> Result<T, SyncError> {
        self.shared.get(Some(timeout))
    }

    /// 等待版本号严格大于 `last_seen` 的数据
    ///
    /// 用于“等下一帧”的场景，不需要轮询，也不会重复交付同一版本。
    pub fn get_next(&self, last_seen: Version) -> Result<(T, Version), SyncError> {
        self.shared.get_next(last_seen, None)
    }

    /// 带超时的 [`Store::get_next`]
    pub fn get_next_timed(
        &self,
        last_seen: Version,
        timeout: Duration,
    ) -> Result<(T, Version), SyncError> {
        self.shared.get_next(last_seen, Some(timeout))
    }

    /// 非阻塞读取，没有数据时返回 `None`
    pub fn try_get(&self) -> Option<T> {
        self.shared.try_get().map(|(value, _)| value)
    }
}

impl<T> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Store<T> {
    fn drop(&mut self) {
        // 唤醒所有阻塞中的读者，它们返回 NotAvailable
        self.shared.release();
    }
}

/// Store 的只读句柄
///
/// 持有共享状态的引用计数，可在 Store 所有者 drop 之后继续存在；
/// 此时所有读取操作返回 `SyncError::NotAvailable`（非阻塞读取返回 `None`）。
pub struct StoreReader<T> {
    shared: Arc<StoreShared<T>>,
}

impl<T> StoreReader<T> {
    /// 从未写入（或已 `purge`）时返回 true
    pub fn is_empty(&self) -> bool {
        self.shared.is_empty()
    }

    /// Store 所有者是否已经 drop
    pub fn is_released(&self) -> bool {
        self.shared.is_released()
    }

    /// 当前版本号
    pub fn version(&self) -> Version {
        self.shared.version()
    }

    /// 转换为读游标
    pub fn into_cursor(self) -> StoreCursor<T> {
        StoreCursor {
            reader: self,
            last_seen: Version::NONE,
        }
    }
}

impl<T: Clone> StoreReader<T> {
    /// 见 [`Store::get`]
    pub fn get(&self) -> Result<T, SyncError> {
        self.shared.get(None)
    }

    /// 见 [`Store::get_timed`]
    pub fn get_timed(&self, timeout: Duration) -> Result<T, SyncError> {
        self.shared.get(Some(timeout))
    }

    /// 见 [`Store::get_next`]
    pub fn get_next(&self, last_seen: Version) -> Result<(T, Version), SyncError> {
        self.shared.get_next(last_seen, None)
    }

    /// 见 [`Store::get_next_timed`]
    pub fn get_next_timed(
        &self,
        last_seen: Version,
        timeout: Duration,
    ) -> Result<(T, Version), SyncError> {
        self.shared.get_next(last_seen, Some(timeout))
    }

    /// 见 [`Store::try_get`]
    pub fn try_get(&self) -> Option<T> {
        self.shared.try_get().map(|(value, _)| value)
    }
}

impl<T> Clone for StoreReader<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

/// 读游标：记住自己读到的最后版本
///
/// 每个消费线程持有一个游标，`next()` 只返回比上次更新的数据。
///
/// # Example
///
/// ```
/// use gearbox_sync::Store;
/// use std::time::Duration;
///
/// let store = Store::new();
/// let mut cursor = store.cursor();
///
/// store.set(1u32);
/// assert!(cursor.has_new_data());
/// assert_eq!(cursor.next().unwrap(), 1);
/// assert!(!cursor.has_new_data());
///
/// // 没有新写入，超时返回
/// assert!(cursor.next_timed(Duration::from_millis(10)).is_err());
/// ```
pub struct StoreCursor<T> {
    reader: StoreReader<T>,
    last_seen: Version,
}

impl<T> StoreCursor<T> {
    /// 是否存在尚未通过本游标读取的数据
    pub fn has_new_data(&self) -> bool {
        let state = self.reader.shared.state.lock();
        !state.released && state.value.is_some() && state.version > self.last_seen.0
    }

    /// 最后读到的版本
    pub fn last_seen(&self) -> Version {
        self.last_seen
    }
}

impl<T: Clone> StoreCursor<T> {
    /// 阻塞直到有比上次更新的数据
    pub fn next(&mut self) -> Result<T, SyncError> {
        let (value, version) = self.reader.get_next(self.last_seen)?;
        self.last_seen = version;
        Ok(value)
    }

    /// 带超时的 [`StoreCursor::next`]
    pub fn next_timed(&mut self, timeout: Duration) -> Result<T, SyncError> {
        let (value, version) = self.reader.get_next_timed(self.last_seen, timeout)?;
        self.last_seen = version;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_new_store_is_empty() {
        let store: Store<f64> = Store::new();
        assert!(store.is_empty());
        assert_eq!(store.version(), Version::NONE);
        assert_eq!(store.try_get(), None);
    }

    #[test]
    fn test_set_then_get() {
        let store = Store::new();
        for _ in 0..3 {
            store.set(20.0);
        }
        assert!(!store.is_empty());
        assert_eq!(store.get().unwrap(), 20.0);
        // 读取不会取走数据
        assert_eq!(store.get().unwrap(), 20.0);
        assert_eq!(store.version().as_u64(), 3);
    }

    #[test]
    fn test_version_strictly_increases() {
        let store = Store::new();
        let mut last = Version::NONE;
        for i in 0..100 {
            let version = store.set(i);
            assert!(version > last);
            last = version;
        }
    }

    #[test]
    fn test_get_timed_zero_on_empty_returns_promptly() {
        let store: Store<u8> = Store::new();
        let start = Instant::now();
        assert_eq!(store.get_timed(Duration::ZERO), Err(SyncError::Timeout));
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_get_timed_waits_for_timeout() {
        let store: Store<u8> = Store::new();
        let start = Instant::now();
        assert_eq!(
            store.get_timed(Duration::from_millis(50)),
            Err(SyncError::Timeout)
        );
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_get_blocks_until_set() {
        let store = Store::new();
        let reader = store.reader();
        let handle = thread::spawn(move || reader.get());

        thread::sleep(Duration::from_millis(20));
        store.set(String::from("scan"));

        assert_eq!(handle.join().unwrap().unwrap(), "scan");
    }

    #[test]
    fn test_get_next_skips_already_seen_version() {
        let store = Store::new();
        let v1 = store.set(1);

        // 当前版本已经看过，不应该立即返回
        assert_eq!(
            store.get_next_timed(v1, Duration::from_millis(20)),
            Err(SyncError::Timeout)
        );

        let v2 = store.set(2);
        assert_eq!(store.get_next(v1).unwrap(), (2, v2));
    }

    #[test]
    fn test_purge_keeps_version_counter() {
        let store = Store::new();
        store.set(1);
        store.set(2);
        store.purge();

        assert!(store.is_empty());
        assert_eq!(store.try_get(), None);
        assert_eq!(store.version().as_u64(), 2);

        assert_eq!(store.set(3).as_u64(), 3);
        assert_eq!(store.get().unwrap(), 3);
    }

    #[test]
    fn test_get_next_after_purge_waits_for_new_write() {
        let store = Store::new();
        store.set(1);
        store.purge();
        // 版本号大于 NONE，但没有数据，仍然需要等待
        assert_eq!(
            store.get_next_timed(Version::NONE, Duration::from_millis(20)),
            Err(SyncError::Timeout)
        );
    }

    #[test]
    fn test_drop_releases_blocked_reader() {
        let store: Store<u32> = Store::new();
        let reader = store.reader();
        let handle = thread::spawn(move || reader.get());

        thread::sleep(Duration::from_millis(20));
        drop(store);

        assert_eq!(handle.join().unwrap(), Err(SyncError::NotAvailable));
    }

    #[test]
    fn test_reader_after_release() {
        let store = Store::new();
        store.set(7);
        let reader = store.reader();
        drop(store);

        assert!(reader.is_released());
        assert!(reader.is_empty());
        assert_eq!(reader.try_get(), None);
        assert_eq!(reader.get(), Err(SyncError::NotAvailable));
        assert_eq!(
            reader.get_next(Version::NONE),
            Err(SyncError::NotAvailable)
        );
    }

    #[test]
    fn test_cursor_tracks_last_seen() {
        let store = Store::new();
        let mut cursor = store.cursor();
        assert!(!cursor.has_new_data());

        store.set('a');
        store.set('b');
        assert!(cursor.has_new_data());
        // 中间版本被覆盖，游标直接拿到最新值
        assert_eq!(cursor.next().unwrap(), 'b');
        assert_eq!(cursor.last_seen(), store.version());
        assert!(!cursor.has_new_data());
    }

    #[test]
    fn test_independent_cursors() {
        let store = Store::new();
        let mut fast = store.cursor();
        let mut slow = store.cursor();

        store.set(1);
        assert_eq!(fast.next().unwrap(), 1);
        // fast 的读取不影响 slow
        assert!(slow.has_new_data());
        assert_eq!(slow.next().unwrap(), 1);
    }
}
