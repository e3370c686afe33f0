// ==========================================
// CSV 行数据导入器 - 日志初始化
// ==========================================
// 使用 tracing / tracing-subscriber
// 导入过程按 run_id 输出结构化字段日志
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日志系统
///
/// 未设置 RUST_LOG 时默认只输出本 crate 的 info 及以上日志。
/// 被丢弃/跳过行的逐行细节在 debug 级别:
/// `RUST_LOG=csv_importer=debug`
///
/// # 示例
/// ```no_run
/// csv_importer::logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("csv_importer=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(false)
        .init();
}

/// 测试环境日志: debug 级别 + 测试写入器，可重复调用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("csv_importer=debug"))
        .with_test_writer()
        .try_init();
}
