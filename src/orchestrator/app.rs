//! 应用入口 - 编排层
//!
//! 读取题目 → （可选）加载中间结果 → 批量答题 → 写出最终结果 → 输出统计

use std::path::Path;

use tracing::{error, info, warn};

use crate::clients::{ChatTransport, LlmClient};
use crate::config::Config;
use crate::error::{AppResult, PersistError};
use crate::models::{load_questions, write_answers, AnswerRecord};
use crate::orchestrator::batch_runner::BatchRunner;
use crate::services::{InferenceService, PartialStore};
use crate::utils::logging::{log_startup, print_final_stats};

/// 应用主结构
pub struct App<T = LlmClient> {
    config: Config,
    runner: BatchRunner<T>,
}

impl App<LlmClient> {
    /// 使用真实的 LLM 接口初始化应用
    pub fn initialize(config: Config) -> Self {
        let client = LlmClient::new(&config);
        Self::with_transport(config, client)
    }
}

impl<T: ChatTransport + 'static> App<T> {
    /// 使用指定的推理接口初始化应用
    pub fn with_transport(config: Config, transport: T) -> Self {
        let service = InferenceService::new(transport, config.retry_policy());
        let runner = BatchRunner::new(service, &config.partial_path)
            .with_concurrency(config.concurrency)
            .with_retry_empty_on_resume(config.retry_empty_on_resume);

        Self { config, runner }
    }

    /// 运行应用主逻辑，返回最终结果列表
    ///
    /// 最终结果文件总是先写出；如果整个运行期间中间结果都没能写盘，
    /// 之后再以 `PersistError::PartialUnsaved` 返回。
    pub async fn run(&self) -> AppResult<Vec<AnswerRecord>> {
        log_startup(self.runner.concurrency(), &self.config.llm_model_name);

        info!("\n📁 正在加载题目: {}", self.config.input_path);
        let questions = load_questions(Path::new(&self.config.input_path)).await?;

        if questions.is_empty() {
            warn!("⚠️ 数据集中没有题目");
        }

        let prior = if self.config.resume {
            self.load_prior().await
        } else {
            None
        };

        let report = self.runner.run_with_report(&questions, prior).await;
        let records = report.records;

        write_answers(Path::new(&self.config.output_path), &records).await?;

        let answered = records.iter().filter(|r| !r.is_empty()).count();
        print_final_stats(
            answered,
            records.len() - answered,
            records.len(),
            &self.config.output_path,
        );

        if !report.partial_saved {
            error!(
                "❌ 中间结果文件始终无法写入: {}（保存失败 {} 次）",
                self.config.partial_path, report.save_failures
            );
            return Err(PersistError::PartialUnsaved {
                path: self.config.partial_path.clone(),
                failures: report.save_failures,
            }
            .into());
        }
        if report.save_failures > 0 {
            warn!(
                "⚠️ 中间结果保存曾失败 {} 次，最终已写入: {}",
                report.save_failures, self.config.partial_path
            );
        }

        Ok(records)
    }

    /// 读取上次的中间结果；读不到时从头开始
    async fn load_prior(&self) -> Option<Vec<Option<AnswerRecord>>> {
        match PartialStore::load(Path::new(&self.config.partial_path)).await {
            Ok(Some(slots)) => Some(slots),
            Ok(None) => {
                info!("未找到中间结果文件，从头开始");
                None
            }
            Err(e) => {
                warn!("⚠️ 无法读取中间结果，从头开始: {}", e);
                None
            }
        }
    }
}
