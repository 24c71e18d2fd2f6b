//! SubsystemThread 与 Status 协作的集成测试

mod common;

use common::{RecordingStatus, wait_for};
use gearbox_sdk::prelude::*;
use gearbox_sdk::SubsystemThreadBuilder;
use std::sync::Arc;
use std::time::Duration;

fn builder(name: &str, status: Arc<dyn Status>) -> SubsystemThreadBuilder {
    SubsystemThread::builder(name)
        .status(status)
        .config(SubsystemConfig::without_stall_detection())
}

/// 工作体返回错误：恰好一次 Fault，join 返回，Status 收到通知
#[test]
fn test_fault_is_reported_exactly_once() {
    let status = Arc::new(RecordingStatus::new());
    let thread = builder("laser", status.clone())
        .spawn(|ctx| {
            ctx.working("scanning");
            anyhow::bail!("checksum mismatch in frame 42")
        })
        .unwrap();

    let err = thread.join().unwrap_err();
    assert!(matches!(err, ThreadError::Fault(ref reason) if reason.contains("checksum")));
    assert_eq!(
        status.faults_of("laser"),
        vec!["checksum mismatch in frame 42".to_string()]
    );
    assert!(matches!(thread.start(), Err(ThreadError::InvalidState(_))));
}

/// stop 是幂等的，状态序列只有一次 ShuttingDown
#[test]
fn test_stop_is_idempotent() {
    let status = Arc::new(RecordingStatus::new());
    let thread = builder("imu", status.clone())
        .spawn(|ctx| {
            ctx.working("");
            ctx.wait_for_stop();
            Ok(())
        })
        .unwrap();

    assert!(wait_for(Duration::from_secs(5), || {
        thread.state() == SubsystemState::Working
    }));
    for _ in 0..3 {
        thread.stop();
    }
    thread.join().unwrap();

    let shutting_down = status
        .states_of("imu")
        .into_iter()
        .filter(|s| *s == SubsystemState::ShuttingDown)
        .count();
    assert_eq!(shutting_down, 1);
    assert_eq!(
        status.states_of("imu").last(),
        Some(&SubsystemState::Finished)
    );
}

/// 看门狗判定卡顿后，LocalStatus 中也能看到
#[test]
fn test_watchdog_stall_visible_in_local_status() {
    let status = Arc::new(LocalStatus::new());
    let config = SubsystemConfig {
        stall_detection: StallDetection::Watchdog,
        stall_threshold_ms: 20,
        watchdog_interval_ms: 5,
        ..SubsystemConfig::default()
    };
    let thread = SubsystemThread::builder("camera")
        .status(status.clone())
        .config(config)
        .spawn(|ctx| {
            ctx.working("grabbing");
            // 不发心跳
            ctx.wait_for_stop();
            Ok(())
        })
        .unwrap();

    assert!(wait_for(Duration::from_secs(5), || {
        status.subsystem_status("camera").unwrap().state == SubsystemState::Stalled
    }));
    assert_eq!(thread.state(), SubsystemState::Stalled);

    thread.stop_and_join().unwrap();
    let snapshot = status.subsystem_status("camera").unwrap();
    assert_eq!(snapshot.state, SubsystemState::Finished);
}

/// 观察者侧检测：LocalStatus::process 找出长时间没有上报的子系统
#[test]
fn test_local_status_process_finds_silent_subsystem() {
    let status = Arc::new(LocalStatus::new());
    let config = SubsystemConfig {
        stall_detection: StallDetection::SelfReported,
        stall_threshold_ms: 20,
        ..SubsystemConfig::default()
    };
    let thread = SubsystemThread::builder("silent")
        .status(status.clone())
        .config(config)
        .spawn(|ctx| {
            ctx.working("");
            ctx.wait_for_stop();
            Ok(())
        })
        .unwrap();

    assert!(wait_for(Duration::from_secs(5), || {
        status.process() == vec!["silent".to_string()]
    }));
    thread.stop_and_join().unwrap();
    assert!(status.process().is_empty());
}

/// 线程 drop 后从 Status 注销
#[test]
fn test_drop_unregisters_subsystem() {
    let status = Arc::new(LocalStatus::new());
    {
        let thread = builder("transient", status.clone())
            .spawn(|ctx| {
                ctx.wait_for_stop();
                Ok(())
            })
            .unwrap();
        assert_eq!(status.subsystems(), vec!["transient".to_string()]);
        assert!(thread.is_started());
    }
    assert!(status.subsystems().is_empty());
}

/// 两个同名线程共用一条记录：先结束的那个不会把记录删掉
#[test]
fn test_same_name_threads_share_registration() {
    let status = Arc::new(LocalStatus::new());
    let body = |ctx: &SubsystemContext| -> anyhow::Result<()> {
        ctx.wait_for_stop();
        Ok(())
    };
    let first = builder("imu", status.clone()).spawn(body).unwrap();
    let second = builder("imu", status.clone()).spawn(body).unwrap();

    first.stop_and_join().unwrap();
    drop(first);
    assert_eq!(status.subsystems(), vec!["imu".to_string()]);
    assert_eq!(
        status.subsystem_status("imu").unwrap().state,
        SubsystemState::Finished
    );

    second.stop_and_join().unwrap();
    drop(second);
    assert!(status.subsystems().is_empty());
}
