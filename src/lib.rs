//! # Final Answer Batch
//!
//! 把一批题目发送给 OpenAI 兼容的推理接口，从回答中提取 `FINAL ANSWER:`，
//! 并把结果按输入顺序写入 JSON 文件。
//!
//! ## 架构设计
//!
//! ### ① 接口层（Clients）
//! - `clients/` - `ChatTransport` 抽象 + 基于 async-openai 的 `LlmClient`
//!
//! ### ② 业务能力层（Services）
//! - `answer_extractor` - 从自由文本中提取并归一化答案
//! - `InferenceService` - 回答单道题，失败时按 `RetryPolicy` 重试
//! - `PartialStore` - 中间结果的内存集合与原子写盘
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/batch_runner` - 并发答题、自动保存、顺序还原
//! - `orchestrator/app` - 读取数据集、继续运行、写出最终结果
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use clients::{ChatRequest, ChatTransport, LlmClient};
pub use config::Config;
pub use error::{AppError, AppResult, TransportError};
pub use models::{AnswerRecord, Question};
pub use orchestrator::{App, BatchReport, BatchRunner};
pub use services::{extract, InferenceService, PartialStore, RetryPolicy};
