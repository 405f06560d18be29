/// LLM API 客户端
///
/// 封装所有与 LLM API 相关的调用逻辑。
/// 每次 `complete` 只发出一个 HTTP 请求，重试统一由 `RetryPolicy` 负责。
use crate::config::Config;
use crate::error::TransportError;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    CreateChatCompletionResponse,
};
use async_trait::async_trait;
use tracing::{debug, warn};

/// 一次聊天请求：固定的系统提示 + 用户消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system_message: String,
    pub user_message: String,
}

/// 推理接口
///
/// 只有一个能力：发送一次请求，拿到原始文本或者错误。
/// 重试、超时、答案提取都不在这一层。
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, TransportError>;
}

/// LLM 客户端（OpenAI 兼容接口）
#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model_name: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(config: &Config) -> Self {
        let base = config.llm_api_base_url.trim_end_matches('/');

        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/chat/completions", base),
            api_key: config.llm_api_key.clone(),
            model_name: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
        }
    }

    fn build_messages(
        &self,
        request: &ChatRequest,
    ) -> Result<Vec<ChatCompletionRequestMessage>, TransportError> {
        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(request.system_message.as_str())
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(request.user_message.as_str())
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(vec![
            ChatCompletionRequestMessage::System(system_msg),
            ChatCompletionRequestMessage::User(user_msg),
        ])
    }
}

#[async_trait]
impl ChatTransport for LlmClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, TransportError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", request.user_message.len());

        let messages = self.build_messages(request)?;

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| {
                warn!("LLM API 请求失败: {}", e);
                TransportError::http(&self.model_name, e)
            })?;

        // 非 2xx 直接算作一次失败，不在这一层重试
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API 返回错误状态 {}: {}", status, body);
            return Err(TransportError::Status {
                model: self.model_name.clone(),
                status,
                body,
            });
        }

        let completion: CreateChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| TransportError::http(&self.model_name, e))?;

        debug!("LLM API 调用成功");

        completion
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| TransportError::EmptyContent {
                model: self.model_name.clone(),
            })
    }
}
