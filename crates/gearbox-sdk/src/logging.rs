//! 日志初始化

use tracing_subscriber::EnvFilter;

/// 安装全局 `tracing` subscriber
///
/// 过滤规则取自 `RUST_LOG`，未设置时为 `info`。
/// 重复调用（或已有其他 subscriber）时不做任何事。
///
/// ```rust
/// gearbox_sdk::init_logger();
/// gearbox_sdk::init_logger();
/// ```
pub fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
