//! 状态注册表错误类型

use thiserror::Error;

/// 状态查询错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    #[error("Unknown subsystem: {0}")]
    UnknownSubsystem(String),
}
