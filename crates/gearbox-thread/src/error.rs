//! 工作线程错误类型定义

use gearbox_sync::SyncError;
use thiserror::Error;

/// 工作线程错误类型
#[derive(Error, Debug)]
pub enum ThreadError {
    /// 非法的生命周期调用（如重复 `start()`、未启动就 `join()`）
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    /// 工作体以故障结束
    #[error("Subsystem fault: {0}")]
    Fault(String),

    /// 同步原语错误（如 `join_timeout` 超时）
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// 创建系统线程失败
    #[error("Failed to spawn thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// 配置无效或解析失败
    #[error("Invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试 ThreadError 的 Display 实现
    #[test]
    fn test_thread_error_display() {
        let err = ThreadError::InvalidState("already started");
        assert_eq!(format!("{}", err), "Invalid state: already started");

        let err = ThreadError::Fault("device unplugged".to_string());
        assert_eq!(format!("{}", err), "Subsystem fault: device unplugged");

        let err = ThreadError::from(SyncError::Timeout);
        assert!(matches!(err, ThreadError::Sync(SyncError::Timeout)));
        assert_eq!(format!("{}", err), "Sync error: Operation timeout");
    }

    #[test]
    fn test_spawn_error_keeps_source() {
        use std::error::Error;

        let err = ThreadError::Spawn(std::io::Error::other("out of threads"));
        assert!(err.source().is_some());
    }
}
