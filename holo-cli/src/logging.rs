//! 日志初始化

use tracing::Level;
use tracing_subscriber::fmt;

/// 解析日志级别，未知值回退到 info
pub fn resolve_level(configured: &str, verbose: bool) -> Level {
    if verbose {
        return Level::DEBUG;
    }
    configured.parse().unwrap_or(Level::INFO)
}

/// 安装全局 fmt 订阅者（输出到 stderr，标准输出留给命令结果）
///
/// 重复调用时保留第一次安装的订阅者。
pub fn init(level: Level) {
    let _ = fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
