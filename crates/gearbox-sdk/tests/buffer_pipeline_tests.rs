//! Buffer 生产者/消费者集成测试

mod common;

use common::wait_for;
use gearbox_sdk::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// 容量 2 的 Block 队列：第三个 push 阻塞，直到消费者取走一个元素
#[test]
fn test_block_policy_producer_waits_for_consumer() {
    let buffer = Buffer::new(BufferConfig::bounded(2, BufferPolicy::Block));
    assert!(buffer.push(1).unwrap().is_accepted());
    assert!(buffer.push(2).unwrap().is_accepted());

    let producer = buffer.handle();
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    let pusher = thread::spawn(move || {
        let outcome = producer.push(3);
        done_tx.send(()).unwrap();
        outcome
    });

    // 队列已满，第三个 push 不应完成
    assert!(done_rx.recv_timeout(Duration::from_millis(50)).is_err());
    assert_eq!(buffer.len(), 2);

    assert_eq!(buffer.pop().unwrap(), 1);
    done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(pusher.join().unwrap().unwrap().is_accepted());

    assert_eq!(buffer.pop().unwrap(), 2);
    assert_eq!(buffer.pop().unwrap(), 3);
    assert!(buffer.is_empty());
}

/// 多生产者单消费者：每个生产者内部的顺序保持不变
#[test]
fn test_fifo_per_producer() {
    let buffer = Buffer::new(BufferConfig::bounded(4, BufferPolicy::Block));
    let producers: Vec<_> = (0..3u32)
        .map(|id| {
            let handle = buffer.handle();
            thread::spawn(move || {
                for seq in 0..100u32 {
                    let _ = handle.push((id, seq)).unwrap();
                }
            })
        })
        .collect();

    let mut last = [None::<u32>; 3];
    for _ in 0..300 {
        let (id, seq) = buffer.pop_timed(Duration::from_secs(5)).unwrap();
        let slot = &mut last[id as usize];
        assert!(slot.is_none_or(|prev| prev + 1 == seq));
        *slot = Some(seq);
    }
    for producer in producers {
        producer.join().unwrap();
    }
    assert_eq!(last, [Some(99); 3]);
}

/// 0ms 超时立即返回
#[test]
fn test_zero_timeout_is_prompt() {
    let buffer: Buffer<u8> = Buffer::new(BufferConfig::bounded(1, BufferPolicy::Block));
    let start = Instant::now();
    assert_eq!(buffer.pop_timed(Duration::ZERO), Err(SyncError::Timeout));
    assert_eq!(buffer.get_timed(Duration::ZERO), Err(SyncError::Timeout));
    assert!(start.elapsed() < Duration::from_millis(100));
}

/// 释放 Buffer 唤醒所有阻塞的读者
#[test]
fn test_drop_releases_blocked_consumers() {
    let buffer: Buffer<u32> = Buffer::new(BufferConfig::bounded(4, BufferPolicy::Block));
    let consumers: Vec<_> = (0..3)
        .map(|i| {
            let handle = buffer.handle();
            thread::spawn(move || {
                if i == 0 {
                    handle.get()
                } else {
                    handle.pop()
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    drop(buffer);

    for consumer in consumers {
        assert_eq!(consumer.join().unwrap(), Err(SyncError::NotAvailable));
    }
}

/// 释放 Buffer 时阻塞的生产者拿回自己的元素
#[test]
fn test_drop_returns_item_to_blocked_producer() {
    let buffer = Buffer::new(BufferConfig::bounded(1, BufferPolicy::Block));
    let _ = buffer.push(String::from("first")).unwrap();

    let producer = buffer.handle();
    let pusher = thread::spawn(move || producer.push(String::from("second")));
    thread::sleep(Duration::from_millis(20));
    drop(buffer);

    let err = pusher.join().unwrap().unwrap_err();
    assert_eq!(err.kind(), SyncError::NotAvailable);
    assert_eq!(err.into_inner(), "second");
}

/// 工作线程通过 Buffer 向所有者交付数据
#[test]
fn test_subsystem_feeds_buffer() {
    let buffer = Buffer::new(BufferConfig::bounded(8, BufferPolicy::OverwriteOldest));
    let producer = buffer.handle();
    let status = Arc::new(LocalStatus::new());

    let device = SubsystemThread::builder("gps")
        .status(status.clone())
        .config(SubsystemConfig::without_stall_detection())
        .spawn(move |ctx| {
            let mut fix = 0u64;
            while ctx.checked_sleep(Duration::from_millis(1)) {
                fix += 1;
                let _ = producer.push(fix)?;
                ctx.heartbeat();
            }
            Ok(())
        })
        .unwrap();

    let mut previous = 0;
    for _ in 0..20 {
        let fix = buffer.pop_timed(Duration::from_secs(5)).unwrap();
        assert!(fix > previous);
        previous = fix;
    }
    assert!(wait_for(Duration::from_secs(5), || {
        status.subsystem_status("gps").unwrap().state == SubsystemState::Working
    }));

    device.stop_and_join().unwrap();
    assert_eq!(
        status.subsystem_status("gps").unwrap().state,
        SubsystemState::Finished
    );
}
