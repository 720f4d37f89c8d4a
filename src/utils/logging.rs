/// 日志工具模块
///
/// 提供日志初始化以及格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化全局日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug / info
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 重复初始化（例如测试中）时忽略错误
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(command: &str, poll_interval_secs: u64) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - {}", command);
    info!("⏱️ 状态轮询间隔: {} 秒", poll_interval_secs);
    info!("{}", "=".repeat(60));
}

/// 打印流水线最终结果
///
/// # 参数
/// - `operation_id`: 任务操作标识
/// - `topics`: 提取的主题数量
/// - `questions`: 生成的题目数量
/// - `review_path`: 审核页面路径
pub fn print_pipeline_summary(
    operation_id: &str,
    topics: usize,
    questions: usize,
    review_path: &str,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 文档处理完成 [任务 {}]", operation_id);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📚 主题: {}", topics);
    info!("📝 草稿题目: {}", questions);
    info!("👉 审核页面: {}", review_path);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
