/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use tracing::info;

/// 记录程序启动信息
///
/// # 参数
/// - `concurrency`: 并发 worker 数
/// - `model`: 模型名称
pub fn log_startup(concurrency: usize, model: &str) {
    info!("{}", "=".repeat(60));
    info!(
        "🚀 程序启动 - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("🤖 模型: {}", model);
    info!("📊 并发数: {}", concurrency);
    info!("{}", "=".repeat(60));
}

/// 记录题目加载信息
///
/// # 参数
/// - `total`: 题目总数
/// - `pending`: 需要请求的题目数（继续运行时可能少于总数）
/// - `concurrency`: 并发 worker 数
pub fn log_questions_loaded(total: usize, pending: usize, concurrency: usize) {
    info!("✓ 共 {} 道题目，本次需要处理 {} 道", total, pending);
    info!("📋 {} 个 worker 同时处理，每完成一道题自动保存\n", concurrency);
}

/// 记录单道题完成后的进度
///
/// # 参数
/// - `position`: 题目位置（从 0 开始）
/// - `answered`: 是否得到了答案
/// - `completed`: 已完成数量
/// - `total`: 题目总数
pub fn log_progress(position: usize, answered: bool, completed: usize, total: usize) {
    let remaining = total.saturating_sub(completed);
    let percentage = if total > 0 {
        completed as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    let mark = if answered { "✓ 完成" } else { "⚠ 空答案" };

    info!(
        "  {} 第 {}/{} 题 | 进度: {}/{} ({:.1}%) | 剩余: {}",
        mark,
        position + 1,
        total,
        completed,
        total,
        percentage,
        remaining
    );
}

/// 打印最终统计信息
///
/// # 参数
/// - `answered`: 得到答案的数量
/// - `empty`: 空答案数量
/// - `total`: 总数
/// - `output_path`: 最终结果文件路径
pub fn print_final_stats(answered: usize, empty: usize, total: usize, output_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 有答案: {}/{}", answered, total);
    info!("❌ 空答案: {}", empty);
    info!("{}", "=".repeat(60));
    info!("\n结果已保存至: {}", output_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
