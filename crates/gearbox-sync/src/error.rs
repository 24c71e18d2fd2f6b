//! 同步原语错误类型定义

use thiserror::Error;

/// `Store`/`Buffer` 阻塞操作的错误类型
///
/// 两种错误都是可恢复的，原语内部不会自动重试，由调用方决定如何处理。
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// 超时等待到期，期间没有可用数据（或空间）
    #[error("Operation timeout")]
    Timeout,

    /// 原语已被释放（所有者已 drop），等待中的线程被唤醒
    #[error("Primitive released while waiting")]
    NotAvailable,
}

/// `Buffer::push_timed` / `Buffer::push` 的错误类型
///
/// 与 `crossbeam_channel::SendTimeoutError` 一样，把未能入队的元素还给调用方。
#[derive(Error, PartialEq, Eq, Clone, Copy)]
pub enum PushError<T> {
    /// Block 策略下等待空间超时
    #[error("Push timed out waiting for free capacity")]
    Timeout(T),

    /// Buffer 已被释放
    #[error("Push into a released buffer")]
    NotAvailable(T),
}

impl<T> PushError<T> {
    /// 取回未入队的元素
    pub fn into_inner(self) -> T {
        match self {
            PushError::Timeout(item) | PushError::NotAvailable(item) => item,
        }
    }

    /// 对应的 `SyncError` 类别
    pub fn kind(&self) -> SyncError {
        match self {
            PushError::Timeout(_) => SyncError::Timeout,
            PushError::NotAvailable(_) => SyncError::NotAvailable,
        }
    }
}

// 手写 Debug：不要求 T: Debug
impl<T> std::fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushError::Timeout(_) => f.write_str("Timeout(..)"),
            PushError::NotAvailable(_) => f.write_str("NotAvailable(..)"),
        }
    }
}

impl<T> From<PushError<T>> for SyncError {
    fn from(err: PushError<T>) -> Self {
        err.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_display() {
        assert_eq!(format!("{}", SyncError::Timeout), "Operation timeout");
        let msg = format!("{}", SyncError::NotAvailable);
        assert!(msg.contains("released"), "NotAvailable message: {}", msg);
    }

    #[test]
    fn test_push_error_returns_item() {
        let err = PushError::Timeout(42);
        assert_eq!(err.kind(), SyncError::Timeout);
        assert_eq!(err.into_inner(), 42);

        let err = PushError::NotAvailable(String::from("scan"));
        assert_eq!(format!("{:?}", err), "NotAvailable(..)");
        let sync: SyncError = err.into();
        assert_eq!(sync, SyncError::NotAvailable);
    }
}
