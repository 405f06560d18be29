//! 批量答题器 - 编排层
//!
//! ## 职责
//!
//! 把一组题目分给固定数量的 worker 并发处理，按输入顺序汇总结果。
//!
//! ## 核心功能
//!
//! 1. **并发控制**：启动 `concurrency` 个 tokio 任务，每个任务反复领取下一道未处理的题目
//! 2. **自动保存**：每完成一道题，在同一把锁内记录结果并整体重写中间结果文件
//! 3. **进度输出**：每完成一道题输出一次进度
//! 4. **顺序还原**：最终结果按题目在输入中的位置排列，与完成顺序无关
//! 5. **继续运行**：可以用上次留下的中间结果预先填充，已完成的题目不再请求
//!
//! 本层不做重试，每道题由 `InferenceService` 给出答案或空答案，这里只记录一次。

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::clients::ChatTransport;
use crate::models::{AnswerRecord, Question};
use crate::services::{InferenceService, PartialStore};
use crate::utils::logging::{log_progress, log_questions_loaded};

const DEFAULT_CONCURRENCY: usize = 10;

/// 一次批量运行的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// 与输入一一对应的结果
    pub records: Vec<AnswerRecord>,
    /// 中间结果保存失败的次数
    pub save_failures: usize,
    /// 运行结束时中间结果文件是否与内存一致
    pub partial_saved: bool,
}

/// 批量答题器
pub struct BatchRunner<T> {
    service: Arc<InferenceService<T>>,
    partial_path: PathBuf,
    concurrency: usize,
    retry_empty_on_resume: bool,
}

/// worker 之间共享的状态
struct SharedWork {
    questions: Vec<Question>,
    /// 需要请求的题目位置
    pending: Vec<usize>,
    /// 下一个待领取的 `pending` 下标
    cursor: AtomicUsize,
    store: Mutex<PartialStore>,
}

impl<T: ChatTransport + 'static> BatchRunner<T> {
    /// 创建批量答题器，中间结果写入 `partial_path`
    pub fn new(service: InferenceService<T>, partial_path: impl Into<PathBuf>) -> Self {
        Self {
            service: Arc::new(service),
            partial_path: partial_path.into(),
            concurrency: DEFAULT_CONCURRENCY,
            retry_empty_on_resume: true,
        }
    }

    /// 设置并发数（0 按 1 处理）
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// 继续运行时是否重新请求上次得到空答案的题目
    pub fn with_retry_empty_on_resume(mut self, retry: bool) -> Self {
        self.retry_empty_on_resume = retry;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// 处理全部题目，返回与输入一一对应的结果
    pub async fn run(&self, questions: &[Question]) -> Vec<AnswerRecord> {
        self.run_resumed(questions, None).await
    }

    /// 处理全部题目，`prior` 是上次运行留下的中间结果
    ///
    /// `prior` 的长度与题目数量不一致时会被忽略。
    pub async fn run_resumed(
        &self,
        questions: &[Question],
        prior: Option<Vec<Option<AnswerRecord>>>,
    ) -> Vec<AnswerRecord> {
        self.run_with_report(questions, prior).await.records
    }

    /// 同 `run_resumed`，另外报告中间结果的保存情况
    pub async fn run_with_report(
        &self,
        questions: &[Question],
        prior: Option<Vec<Option<AnswerRecord>>>,
    ) -> BatchReport {
        let total = questions.len();
        let store = PartialStore::with_slots(&self.partial_path, self.initial_slots(total, prior));
        let pending: Vec<usize> = (0..total).filter(|p| !store.is_filled(*p)).collect();

        log_questions_loaded(total, pending.len(), self.concurrency);

        if pending.is_empty() {
            info!("没有需要处理的题目");
            return BatchReport {
                records: store.to_records(),
                save_failures: 0,
                partial_saved: true,
            };
        }

        let workers = self.concurrency.min(pending.len());
        let shared = Arc::new(SharedWork {
            questions: questions.to_vec(),
            pending,
            cursor: AtomicUsize::new(0),
            store: Mutex::new(store),
        });

        let handles: Vec<_> = (0..workers)
            .map(|worker_id| {
                let service = self.service.clone();
                let shared = shared.clone();
                tokio::spawn(async move { run_worker(worker_id, service, shared).await })
            })
            .collect();

        for (worker_id, result) in join_all(handles).await.into_iter().enumerate() {
            if let Err(e) = result {
                // 该 worker 正在处理的题目保持未完成，最终按空答案输出
                error!("[worker {}] 任务执行失败: {}", worker_id, e);
            }
        }

        let mut store = shared.store.lock().await;
        if store.flush().await.is_err() {
            error!(
                "❌ 最终保存中间结果失败: {}（结果仍会返回给调用方）",
                store.path().display()
            );
        }

        info!(
            "全部 {} 道题处理完毕，中间结果保存失败 {} 次",
            total,
            store.save_failures()
        );

        BatchReport {
            records: store.to_records(),
            save_failures: store.save_failures(),
            partial_saved: !store.is_dirty(),
        }
    }

    fn initial_slots(
        &self,
        total: usize,
        prior: Option<Vec<Option<AnswerRecord>>>,
    ) -> Vec<Option<AnswerRecord>> {
        match prior {
            Some(prior) if prior.len() == total => {
                let slots: Vec<Option<AnswerRecord>> = prior
                    .into_iter()
                    .map(|slot| match slot {
                        Some(record) if record.is_empty() && self.retry_empty_on_resume => None,
                        other => other,
                    })
                    .collect();
                info!(
                    "📂 从中间结果继续，已有 {} 道题的结果",
                    slots.iter().filter(|slot| slot.is_some()).count()
                );
                slots
            }
            Some(prior) => {
                warn!(
                    "⚠️ 中间结果有 {} 项，与题目数量 {} 不一致，忽略并从头开始",
                    prior.len(),
                    total
                );
                vec![None; total]
            }
            None => vec![None; total],
        }
    }
}

/// 单个 worker：领取题目 → 回答 → 记录并保存，直到没有题目
async fn run_worker<T: ChatTransport>(
    worker_id: usize,
    service: Arc<InferenceService<T>>,
    shared: Arc<SharedWork>,
) {
    loop {
        let next = shared.cursor.fetch_add(1, Ordering::SeqCst);
        let Some(&position) = shared.pending.get(next) else {
            break;
        };
        let question = &shared.questions[position];

        debug!("[worker {}] 开始处理第 {} 题 ({})", worker_id, position + 1, question.label());

        let record = AnswerRecord::from(service.answer(question).await);
        let answered = !record.is_empty();

        // 记录 + 写盘 + 进度在同一把锁内完成，写文件不会交错
        let mut store = shared.store.lock().await;
        store.record(position, record);
        // 失败已在 save 内记录，未写盘的结果会随下一次保存一起写入
        let _ = store.save().await;
        log_progress(position, answered, store.completed(), store.total());
    }

    debug!("[worker {}] 没有待处理的题目，退出", worker_id);
}
