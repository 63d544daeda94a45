use tracing_subscriber::{EnvFilter, fmt};

/// 未设置 RUST_LOG 时的默认过滤规则
const DEFAULT_FILTER: &str = "info";

/// 初始化日志系统
///
/// RUST_LOG 优先，默认 info。每次运行都带有 `run` span（run_id、method、url），
/// 脚本的 console 输出走 `collrun::script` target，可单独过滤:
/// - RUST_LOG=collrun::script=debug collrun run req.json
/// - RUST_LOG=collrun=trace collrun run req.json
pub fn init_logger() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // 重复初始化（例如测试中）时忽略错误
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();

    tracing::debug!("Logger initialized");
}
