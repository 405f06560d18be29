//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 加载配置对应的题目数据集
//! - 继续运行时读取中间结果
//! - 写出最终结果文件并输出统计
//!
//! ### `batch_runner` - 批量答题器
//! - 固定数量的 worker 并发领取题目
//! - 每完成一道题自动保存中间结果
//! - 按输入顺序汇总结果
//!
//! ## 层次关系
//!
//! ```text
//! app
//!     ↓
//! batch_runner (处理 Vec<Question>)
//!     ↓
//! services::InferenceService (处理单个 Question，重试)
//!     ↓
//! services::answer_extractor + clients::ChatTransport
//! ```

pub mod app;
pub mod batch_runner;

pub use app::App;
pub use batch_runner::{BatchReport, BatchRunner};
