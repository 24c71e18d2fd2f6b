//! LocalStatus：进程内保存子系统状态的 Status 实现
//!
//! 除了记录每个子系统的最新状态，还提供观察者侧的心跳检查：
//! 某个线程周期性调用 [`LocalStatus::process`]，返回心跳超期的子系统。

use crate::error::StatusError;
use crate::state::SubsystemState;
use crate::status::Status;
use gearbox_sync::Timer;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// 单个子系统的状态快照
#[derive(Debug, Clone, PartialEq)]
pub struct SubsystemStatus {
    /// 当前状态
    pub state: SubsystemState,
    /// 最近一次上报的说明
    pub message: String,
    /// 距离上次心跳（或状态上报）的时间
    pub since_heartbeat: Duration,
    /// `since_heartbeat` 与最大心跳间隔之比
    ///
    /// 例如 0.5 表示已过去一半的允许间隔；未设置间隔时为 0。
    pub heartbeat_ratio: f64,
}

#[derive(Debug)]
struct Entry {
    state: SubsystemState,
    message: String,
    last_heartbeat: Timer,
    max_heartbeat_interval: Option<Duration>,
    /// 同名注册次数，归零时才删除
    registrations: usize,
}

impl Entry {
    fn new(max_heartbeat_interval: Option<Duration>) -> Self {
        Self {
            state: SubsystemState::Initializing,
            message: String::new(),
            last_heartbeat: Timer::new(),
            max_heartbeat_interval,
            registrations: 1,
        }
    }

    fn heartbeat_ratio(&self) -> f64 {
        match self.max_heartbeat_interval {
            Some(interval) if !interval.is_zero() => {
                self.last_heartbeat.elapsed().as_secs_f64() / interval.as_secs_f64()
            },
            _ => 0.0,
        }
    }

    fn is_overdue(&self) -> bool {
        !self.state.is_terminal()
            && self
                .max_heartbeat_interval
                .is_some_and(|interval| self.last_heartbeat.has_elapsed(interval))
    }
}

/// 进程内状态注册表
///
/// 使用 `parking_lot::RwLock`：查询多、写入少，且不会 Poison。
///
/// 同名子系统可以注册多次（共享同一条记录），
/// 每次 `remove_subsystem` 抵消一次注册，全部抵消后记录才被删除。
#[derive(Debug, Default)]
pub struct LocalStatus {
    subsystems: RwLock<BTreeMap<String, Entry>>,
}

impl LocalStatus {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 已注册的子系统名称（按名称排序）
    pub fn subsystems(&self) -> Vec<String> {
        self.subsystems.read().keys().cloned().collect()
    }

    /// 查询子系统状态
    pub fn subsystem_status(&self, subsystem: &str) -> Result<SubsystemStatus, StatusError> {
        let subsystems = self.subsystems.read();
        let entry = subsystems
            .get(subsystem)
            .ok_or_else(|| StatusError::UnknownSubsystem(subsystem.to_string()))?;
        Ok(SubsystemStatus {
            state: entry.state.clone(),
            message: entry.message.clone(),
            since_heartbeat: entry.last_heartbeat.elapsed(),
            heartbeat_ratio: entry.heartbeat_ratio(),
        })
    }

    /// 修改最大心跳间隔（`None` = 不检测）
    pub fn set_max_heartbeat_interval(
        &self,
        subsystem: &str,
        interval: Option<Duration>,
    ) -> Result<(), StatusError> {
        let mut subsystems = self.subsystems.write();
        let entry = subsystems
            .get_mut(subsystem)
            .ok_or_else(|| StatusError::UnknownSubsystem(subsystem.to_string()))?;
        entry.max_heartbeat_interval = interval;
        Ok(())
    }

    /// 检查心跳，返回超期未上报的子系统
    ///
    /// 终止状态（Finished/Fault）的子系统不参与检查。
    pub fn process(&self) -> Vec<String> {
        let overdue: Vec<String> = self
            .subsystems
            .read()
            .iter()
            .filter(|(_, entry)| entry.is_overdue())
            .map(|(name, _)| name.clone())
            .collect();
        for name in &overdue {
            warn!("Subsystem '{}' has not reported within its heartbeat interval", name);
        }
        overdue
    }
}

impl Status for LocalStatus {
    fn add_subsystem(&self, subsystem: &str, max_heartbeat_interval: Option<Duration>) {
        let mut subsystems = self.subsystems.write();
        if let Some(entry) = subsystems.get_mut(subsystem) {
            entry.registrations += 1;
            warn!(
                "Subsystem '{}' already registered ({} registrations), sharing existing entry",
                subsystem, entry.registrations
            );
            return;
        }
        debug!("Adding subsystem '{}'", subsystem);
        subsystems.insert(subsystem.to_string(), Entry::new(max_heartbeat_interval));
    }

    fn remove_subsystem(&self, subsystem: &str) {
        let mut subsystems = self.subsystems.write();
        let Some(entry) = subsystems.get_mut(subsystem) else {
            warn!("Removing unknown subsystem '{}'", subsystem);
            return;
        };
        entry.registrations -= 1;
        if entry.registrations == 0 {
            debug!("Removing subsystem '{}'", subsystem);
            subsystems.remove(subsystem);
        }
    }

    fn set_state(&self, subsystem: &str, state: &SubsystemState, message: &str) {
        let mut subsystems = self.subsystems.write();
        let entry = subsystems.entry(subsystem.to_string()).or_insert_with(|| {
            warn!("State reported for unregistered subsystem '{}', registering it", subsystem);
            Entry::new(None)
        });
        entry.state = state.clone();
        entry.message = message.to_string();
        // 任何上报都说明子系统还活着
        entry.last_heartbeat.restart();
    }

    fn heartbeat(&self, subsystem: &str) {
        match self.subsystems.write().get_mut(subsystem) {
            Some(entry) => entry.last_heartbeat.restart(),
            None => warn!("Heartbeat from unknown subsystem '{}'", subsystem),
        }
    }
}
