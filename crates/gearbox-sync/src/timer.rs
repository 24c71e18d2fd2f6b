//! 单调计时器
//!
//! 基于 `std::time::Instant`，不受系统时钟调整（NTP、手动修改）影响。

use std::time::{Duration, Instant};

/// 单调秒表
///
/// 构造时记录起点，之后通过 `elapsed*()` 读取经过的时间，`restart()` 重新计时。
///
/// 本身不是线程安全的（`restart` 需要 `&mut self`），
/// 需要跨线程共享时放在锁内使用，见 `Store`/`Buffer` 的超时等待。
///
/// # Example
///
/// ```
/// use gearbox_sync::Timer;
/// use std::time::Duration;
///
/// let mut timer = Timer::new();
/// std::thread::sleep(Duration::from_millis(5));
/// assert!(timer.elapsed_ms() >= 5.0);
///
/// timer.restart();
/// assert!(timer.elapsed() < Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// 创建计时器，起点为当前时刻
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// 将起点重置为当前时刻
    pub fn restart(&mut self) {
        self.start = Instant::now();
    }

    /// 起点时刻
    pub fn started_at(&self) -> Instant {
        self.start
    }

    /// 自起点以来经过的时间
    ///
    /// `Instant` 单调，结果永远不会为负。
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// 经过的毫秒数
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }

    /// 经过的秒数
    pub fn elapsed_sec(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    /// 距离 `timeout` 还剩多少时间（已超时返回 `Duration::ZERO`）
    ///
    /// 供超时等待循环使用：每次被唤醒后重新计算剩余时间，
    /// 避免虚假唤醒导致总等待时间超出预期。
    pub fn remaining(&self, timeout: Duration) -> Duration {
        timeout.saturating_sub(self.elapsed())
    }

    /// 是否已经超过 `timeout`
    pub fn has_elapsed(&self, timeout: Duration) -> bool {
        self.elapsed() >= timeout
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_elapsed_is_monotonic() {
        let timer = Timer::new();
        let mut last = timer.elapsed();
        for _ in 0..100 {
            thread::sleep(Duration::from_micros(100));
            let current = timer.elapsed();
            assert!(
                current >= last,
                "Elapsed time should never decrease (current={:?}, last={:?})",
                current,
                last
            );
            last = current;
        }
    }

    #[test]
    fn test_elapsed_units_agree() {
        let timer = Timer::new();
        thread::sleep(Duration::from_millis(20));
        let ms = timer.elapsed_ms();
        let sec = timer.elapsed_sec();
        assert!(ms >= 20.0);
        assert!(sec >= 0.020);
        // 两次读取之间还会流逝一点时间，只检查量级
        assert!((ms / 1000.0 - sec).abs() < 0.05);
    }

    #[test]
    fn test_restart_resets_origin() {
        let mut timer = Timer::new();
        thread::sleep(Duration::from_millis(30));
        assert!(timer.elapsed() >= Duration::from_millis(30));

        timer.restart();
        assert!(timer.elapsed() < Duration::from_millis(30));
    }

    #[test]
    fn test_remaining_saturates_at_zero() {
        let timer = Timer::new();
        assert_eq!(timer.remaining(Duration::ZERO), Duration::ZERO);
        assert!(timer.has_elapsed(Duration::ZERO));

        thread::sleep(Duration::from_millis(5));
        assert_eq!(timer.remaining(Duration::from_millis(1)), Duration::ZERO);
        assert!(timer.remaining(Duration::from_secs(10)) > Duration::from_secs(9));
    }
}
