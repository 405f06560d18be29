//! 推理服务 - 业务能力层
//!
//! 只负责"回答一道题"：构建请求 → 调用接口 → 提取答案，失败时按策略重试。
//! 所有失败都在这里被吸收，调用方只会拿到答案或 `None`。

use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::clients::{ChatRequest, ChatTransport};
use crate::error::TransportError;
use crate::models::Question;
use crate::services::answer_extractor::extract;
use crate::utils::logging::truncate_text;

/// 固定的系统提示
pub const SYSTEM_PROMPT: &str = "You are a careful problem solver. Think briefly step by step, \
then give the final answer on exactly one line as: FINAL ANSWER: <value>";

/// 重试策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 总尝试次数（包括第一次）
    pub max_attempts: u32,
    /// 第 k 次尝试（k >= 2）前等待 `delays[k - 2]`，列表不够长时沿用最后一项
    pub delays: Vec<Duration>,
    /// 单次请求超时
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delays: vec![Duration::from_secs(1), Duration::from_secs(2)],
            attempt_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// 不等待的策略，测试用
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delays: Vec::new(),
            attempt_timeout: Duration::from_secs(60),
        }
    }

    /// 第 `attempt` 次尝试（从 1 开始）之前需要等待的时间
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let index = (attempt as usize - 2).min(self.delays.len().saturating_sub(1));
        self.delays.get(index).copied().unwrap_or(Duration::ZERO)
    }
}

/// 单次尝试失败的原因
#[derive(Debug, Error)]
enum AttemptError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("响应中没有可用的 FINAL ANSWER: {preview}")]
    NoAnswer { preview: String },
}

/// 推理服务
///
/// 职责：
/// - 只处理单道题目
/// - 不持有任何跨调用的可变状态，可以被多个 worker 同时使用
pub struct InferenceService<T> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: ChatTransport> InferenceService<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// 构建一道题的请求
    pub fn build_request(question_text: &str) -> ChatRequest {
        ChatRequest {
            system_message: SYSTEM_PROMPT.to_string(),
            user_message: format!(
                "Solve the question below.\n\n{}\n\nEnd with 'FINAL ANSWER: <value>'.",
                question_text
            ),
        }
    }

    /// 回答一道题
    ///
    /// 接口失败、超时、响应里提取不到答案，都算一次失败的尝试。
    /// 尝试次数用完后返回 `None`，不会返回错误。
    pub async fn answer(&self, question: &Question) -> Option<String> {
        let request = Self::build_request(&question.text);
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let delay = self.policy.delay_before(attempt);
            if !delay.is_zero() {
                debug!(
                    "[题目 {}] 等待 {:?} 后进行第 {} 次尝试",
                    question.label(),
                    delay,
                    attempt
                );
                sleep(delay).await;
            }

            match self.attempt(&request).await {
                Ok(answer) => {
                    debug!("[题目 {}] ✓ 第 {} 次尝试得到答案: {}", question.label(), attempt, answer);
                    return Some(answer);
                }
                Err(e) => {
                    warn!(
                        "[题目 {}] 第 {}/{} 次尝试失败: {}",
                        question.label(),
                        attempt,
                        max_attempts,
                        e
                    );
                }
            }
        }

        warn!(
            "[题目 {}] ❌ 已尝试 {} 次仍未得到答案，记为空答案",
            question.label(),
            max_attempts
        );
        None
    }

    async fn attempt(&self, request: &ChatRequest) -> Result<String, AttemptError> {
        let raw = timeout(self.policy.attempt_timeout, self.transport.complete(request))
            .await
            .map_err(|_| TransportError::Timeout {
                timeout: self.policy.attempt_timeout,
            })??;

        extract(&raw).ok_or_else(|| AttemptError::NoAnswer {
            preview: truncate_text(&raw, 80),
        })
    }
}
