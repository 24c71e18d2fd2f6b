//! 设备数据管线演示
//!
//! 模拟一个激光雷达驱动线程：
//! - 最新一帧写入 `Store`，供控制循环按版本读取
//! - 每一帧同时推入 `Buffer`，供记录线程顺序消费
//! - `LocalStatus` 收集子系统状态，主线程周期打印

use clap::Parser;
use gearbox_sdk::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "device_pipeline")]
#[command(about = "设备数据管线演示 - Store/Buffer/SubsystemThread 协作")]
struct Args {
    /// 扫描频率（Hz，默认: 50）
    #[arg(long, default_value = "50")]
    rate_hz: f64,

    /// 运行时长（秒，默认: 3）
    #[arg(long, default_value = "3")]
    duration_sec: u64,

    /// 记录队列容量（默认: 16）
    #[arg(long, default_value = "16")]
    capacity: usize,

    /// 第 N 帧时模拟一次设备卡顿（0 = 不卡顿）
    #[arg(long, default_value = "60")]
    stall_at: u64,

    /// 子系统配置文件（TOML，可选）
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

#[derive(Debug, Clone)]
struct Scan {
    seq: u64,
    ranges: Vec<f32>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    gearbox_sdk::init_logger();

    println!("🛰️  GearBox - 设备数据管线演示");
    println!("=========================\n");

    let config = match &args.config {
        Some(path) => SubsystemConfig::load_from_file(path)?,
        None => SubsystemConfig {
            stall_threshold_ms: 200,
            watchdog_interval_ms: 20,
            ..SubsystemConfig::default()
        },
    };
    println!("⚙️  子系统配置: {:?}\n", config);

    let latest: Store<Scan> = Store::new();
    let mut control_cursor = latest.cursor();
    let log_queue = Buffer::new(BufferConfig::bounded(
        args.capacity,
        BufferPolicy::OverwriteOldest,
    ));
    let log_producer = log_queue.handle();
    let log_consumer = log_queue.handle();
    let status = Arc::new(LocalStatus::new());

    // ==================== 设备线程 ====================
    let period = Duration::from_secs_f64(1.0 / args.rate_hz);
    let stall_at = args.stall_at;
    let laser = SubsystemThread::builder("laser")
        .status(status.clone())
        .config(config)
        .spawn(move |ctx| {
            ctx.working("scanning");
            let mut seq = 0u64;
            while ctx.checked_sleep(period) {
                seq += 1;
                if seq == stall_at {
                    // 模拟设备无响应
                    ctx.checked_sleep(Duration::from_millis(400));
                }
                let scan = Scan {
                    seq,
                    ranges: (0..8).map(|i| 1.0 + (seq + i) as f32 * 0.01).collect(),
                };
                latest.set(scan.clone());
                if log_producer.push(scan)?.is_evicted() {
                    ctx.set_message("log queue overflow, dropping oldest scan");
                }
                ctx.heartbeat();
            }
            Ok(())
        })?;
    println!("   ✅ 设备线程已启动\n");

    // ==================== 控制线程 ====================
    let control = thread::spawn(move || {
        let mut received = 0u64;
        loop {
            match control_cursor.next_timed(Duration::from_millis(500)) {
                Ok(scan) => {
                    received += 1;
                    if scan.seq % 25 == 0 {
                        println!("   🎯 控制循环: 第 {} 帧, ranges[0] = {:.2}", scan.seq, scan.ranges[0]);
                    }
                },
                Err(SyncError::Timeout) => println!("   ⚠️  控制循环: 500ms 内没有新数据"),
                Err(SyncError::NotAvailable) => break,
            }
        }
        received
    });

    // ==================== 记录线程 ====================
    let logger = thread::spawn(move || {
        let mut logged = 0u64;
        let mut last_seq = 0u64;
        while let Ok(scan) = log_consumer.pop() {
            logged += 1;
            last_seq = scan.seq;
        }
        (logged, last_seq)
    });

    // ==================== 监控 ====================
    let monitor_period = Duration::from_millis(500);
    let timer = Timer::new();
    while !timer.has_elapsed(Duration::from_secs(args.duration_sec)) {
        thread::sleep(monitor_period);
        let snapshot = status.subsystem_status("laser")?;
        println!(
            "📊 [{:>5.1}s] laser: {} '{}' (heartbeat {:.0}%)",
            timer.elapsed_sec(),
            snapshot.state,
            snapshot.message,
            snapshot.heartbeat_ratio * 100.0
        );
        for name in status.process() {
            println!("   ⏰ {} 心跳超时", name);
        }
    }

    println!("\n🛑 停止设备线程...");
    laser.stop_and_join()?;
    println!("   ✅ 最终状态: {}", laser.state());

    // 工作体结束后 Store/BufferHandle 随之释放；drop Buffer 所有者唤醒记录线程
    drop(log_queue);
    let received = control.join().map_err(|_| anyhow::anyhow!("control thread panicked"))?;
    let (logged, last_seq) = logger
        .join()
        .map_err(|_| anyhow::anyhow!("logger thread panicked"))?;

    println!("\n📈 统计:");
    println!("   控制循环收到 {} 帧", received);
    println!("   记录线程写入 {} 帧（最后一帧 #{}）", logged, last_seq);

    Ok(())
}
