//! 子系统状态机定义
//!
//! ```text
//! Initializing ──▶ Working ⇄ Stalled ──▶ ShuttingDown ──▶ Finished
//!       │             │          │             │
//!       └─────────────┴──────────┴─────────────┴──────▶ Fault(msg)
//! ```
//!
//! `Finished` 与 `Fault` 为终止状态，之后不再有任何转移。

use std::fmt;

/// 子系统状态（健康状态）
///
/// 封闭枚举，`Fault` 携带故障原因。状态只能沿上图单向推进，
/// 使用 [`SubsystemState::can_transition_to`] 检查。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SubsystemState {
    /// 已创建，尚未开始正常工作
    #[default]
    Initializing,
    /// 正常运行，心跳及时
    Working,
    /// 心跳超时（可恢复，收到心跳后回到 Working）
    Stalled,
    /// 所有者请求停止，等待工作体退出
    ShuttingDown,
    /// 正常退出（终止状态）
    Finished,
    /// 不可恢复的错误（终止状态）
    Fault(String),
}

impl SubsystemState {
    /// 是否为终止状态
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubsystemState::Finished | SubsystemState::Fault(_))
    }

    /// 是否为故障状态
    pub fn is_fault(&self) -> bool {
        matches!(self, SubsystemState::Fault(_))
    }

    /// 状态名称（不含故障信息）
    pub fn as_str(&self) -> &'static str {
        match self {
            SubsystemState::Initializing => "Initializing",
            SubsystemState::Working => "Working",
            SubsystemState::Stalled => "Stalled",
            SubsystemState::ShuttingDown => "ShuttingDown",
            SubsystemState::Finished => "Finished",
            SubsystemState::Fault(_) => "Fault",
        }
    }

    /// 检查从 `self` 到 `next` 的转移是否合法
    ///
    /// 同一状态之间的“转移”不合法（不是状态变化）。
    ///
    /// # Example
    ///
    /// ```
    /// use gearbox_status::SubsystemState;
    ///
    /// assert!(SubsystemState::Working.can_transition_to(&SubsystemState::Stalled));
    /// assert!(SubsystemState::Stalled.can_transition_to(&SubsystemState::Working));
    /// assert!(!SubsystemState::Finished.can_transition_to(&SubsystemState::Working));
    /// assert!(!SubsystemState::ShuttingDown.can_transition_to(&SubsystemState::Working));
    /// ```
    pub fn can_transition_to(&self, next: &SubsystemState) -> bool {
        use SubsystemState::*;

        match (self, next) {
            (Finished | Fault(_), _) => false,
            (_, Fault(_)) => true,
            (Initializing, Working | Stalled | ShuttingDown | Finished) => true,
            (Working, Stalled | ShuttingDown | Finished) => true,
            (Stalled, Working | ShuttingDown | Finished) => true,
            (ShuttingDown, Finished) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SubsystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubsystemState::Fault(reason) => write!(f, "Fault({})", reason),
            other => f.write_str(other.as_str()),
        }
    }
}
