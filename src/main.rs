use anyhow::Result;
use final_answer_batch::{logger, App, Config};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    // 第一个参数（可选）是 TOML 配置文件路径
    let config_path = std::env::args().nth(1).map(PathBuf::from);

    // 加载配置
    let config = Config::load(config_path.as_deref())?;

    // 初始化日志
    logger::init(config.verbose_logging);

    // 初始化并运行应用
    App::initialize(config).run().await?;

    Ok(())
}
