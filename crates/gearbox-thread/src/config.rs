//! 工作线程配置
//!
//! 可以在代码中构造，也可以从 TOML 加载：
//!
//! ```toml
//! stall_detection = "watchdog"
//! stall_threshold_ms = 500
//! watchdog_interval_ms = 50
//! shutdown_timeout_ms = 2000
//! ```

use crate::error::ThreadError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 卡顿（Stalled）检测方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StallDetection {
    /// 不检测，永远不会进入 Stalled
    Disabled,
    /// 只由工作体通过 `SubsystemContext::report_stalled` 主动上报
    SelfReported,
    /// 看门狗线程周期检查心跳，超过阈值自动进入 Stalled
    #[default]
    Watchdog,
}

/// 工作线程配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsystemConfig {
    /// 卡顿检测方式
    pub stall_detection: StallDetection,
    /// 心跳超时阈值（毫秒）
    pub stall_threshold_ms: u64,
    /// 看门狗检查周期（毫秒）
    pub watchdog_interval_ms: u64,
    /// drop 时等待线程退出的最长时间（毫秒）
    pub shutdown_timeout_ms: u64,
}

impl Default for SubsystemConfig {
    fn default() -> Self {
        Self {
            stall_detection: StallDetection::Watchdog,
            stall_threshold_ms: 1000,
            watchdog_interval_ms: 100,
            shutdown_timeout_ms: 2000,
        }
    }
}

impl SubsystemConfig {
    /// 关闭卡顿检测的配置
    pub fn without_stall_detection() -> Self {
        Self {
            stall_detection: StallDetection::Disabled,
            ..Self::default()
        }
    }

    pub fn stall_threshold(&self) -> Duration {
        Duration::from_millis(self.stall_threshold_ms)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// 注册到 Status 时使用的最大心跳间隔（关闭检测时为 `None`）
    pub fn max_heartbeat_interval(&self) -> Option<Duration> {
        match self.stall_detection {
            StallDetection::Disabled => None,
            StallDetection::SelfReported | StallDetection::Watchdog => Some(self.stall_threshold()),
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ThreadError> {
        if self.stall_detection != StallDetection::Disabled && self.stall_threshold_ms == 0 {
            return Err(ThreadError::Config(
                "stall_threshold_ms must be greater than 0".to_string(),
            ));
        }
        if self.stall_detection == StallDetection::Watchdog && self.watchdog_interval_ms == 0 {
            return Err(ThreadError::Config(
                "watchdog_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ThreadError> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| ThreadError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ThreadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ThreadError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}
