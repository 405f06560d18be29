use crate::error::{AppResult, ConfigError};
use crate::services::RetryPolicy;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 程序配置文件
///
/// 加载顺序：默认值 → TOML 配置文件（可选）→ 环境变量
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 同时处理的题目数量（worker 数）
    pub concurrency: usize,
    /// 题目数据集（JSON）
    pub input_path: String,
    /// 中间结果文件，每完成一道题重写一次
    pub partial_path: String,
    /// 最终结果文件
    pub output_path: String,
    /// 是否从中间结果文件继续
    pub resume: bool,
    /// 继续时是否重新请求空答案的题目
    pub retry_empty_on_resume: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    // --- 重试配置 ---
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 每道题的总尝试次数
    pub max_attempts: u32,
    /// 第 2、3... 次尝试前的等待时间（毫秒）
    pub retry_delays_ms: Vec<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: 10,
            input_path: "questions.json".to_string(),
            partial_path: "answers_partial.json".to_string(),
            output_path: "answers.json".to_string(),
            resume: false,
            retry_empty_on_resume: true,
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "http://127.0.0.1:8000/v1".to_string(),
            llm_model_name: "default".to_string(),
            llm_temperature: 0.3,
            llm_max_tokens: 256,
            request_timeout_secs: 60,
            max_attempts: 3,
            retry_delays_ms: vec![1000, 2000],
        }
    }
}

impl Config {
    /// 读取配置文件（如果提供），再叠加环境变量，最后做合法性检查
    ///
    /// 不提供配置文件时等价于默认值 + 环境变量。
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let base = match path {
            Some(path) => {
                let content =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
                        path: path.display().to_string(),
                        source,
                    })?;
                Self::from_toml_str(&content, &path.display().to_string())?
            }
            None => Self::default(),
        };

        let config = base.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 解析 TOML 内容，缺省的字段使用默认值
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
            path: origin.to_string(),
            source,
        })
    }

    fn with_env_overrides(self) -> Self {
        Self {
            concurrency: env_parse("CONCURRENCY").unwrap_or(self.concurrency),
            input_path: std::env::var("INPUT_PATH").unwrap_or(self.input_path),
            partial_path: std::env::var("PARTIAL_PATH").unwrap_or(self.partial_path),
            output_path: std::env::var("OUTPUT_PATH").unwrap_or(self.output_path),
            resume: env_parse("RESUME").unwrap_or(self.resume),
            retry_empty_on_resume: env_parse("RETRY_EMPTY_ON_RESUME")
                .unwrap_or(self.retry_empty_on_resume),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(self.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            llm_temperature: env_parse("LLM_TEMPERATURE").unwrap_or(self.llm_temperature),
            llm_max_tokens: env_parse("LLM_MAX_TOKENS").unwrap_or(self.llm_max_tokens),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS")
                .unwrap_or(self.request_timeout_secs),
            max_attempts: env_parse("MAX_ATTEMPTS").unwrap_or(self.max_attempts),
            retry_delays_ms: std::env::var("RETRY_DELAYS_MS")
                .ok()
                .and_then(|v| parse_delay_list(&v))
                .unwrap_or(self.retry_delays_ms),
        }
    }

    /// 检查配置值
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "concurrency".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "max_attempts".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "request_timeout_secs".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        Ok(())
    }

    /// 根据配置构建重试策略
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delays: self
                .retry_delays_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            attempt_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// 解析形如 "1000,2000" 的延迟列表，任何一项非法则整体忽略
fn parse_delay_list(raw: &str) -> Option<Vec<u64>> {
    raw.split(',')
        .map(|part| part.trim().parse::<u64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_default_retry_policy_matches_one_and_two_seconds() {
        let policy = Config::default().retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(
            policy.delays,
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
        assert_eq!(policy.attempt_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
concurrency = 4
llm_model_name = "bens_model"
retry_delays_ms = [0, 0]
"#,
            "inline",
        )
        .unwrap();

        assert_eq!(config.concurrency, 4);
        assert_eq!(config.llm_model_name, "bens_model");
        assert_eq!(config.retry_delays_ms, vec![0, 0]);
        // 未出现的字段保持默认值
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.partial_path, "answers_partial.json");
    }

    #[test]
    fn test_bad_toml_reports_origin() {
        let err = Config::from_toml_str("concurrency = \"many\"", "broken.toml").unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = Config::default();
        assert_ok!(config.validate());

        config.max_attempts = 0;
        assert_err!(config.validate());

        config.max_attempts = 3;
        config.concurrency = 0;
        assert_err!(config.validate());
    }

    /// 环境变量是进程级状态，相关断言放在同一个测试里避免并行干扰
    #[test]
    fn test_load_reads_file_then_env_then_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
concurrency = 4
llm_model_name = "from_file"
output_path = "out/answers.json"
retry_delays_ms = [500]
"#,
        )
        .unwrap();

        // 只有配置文件
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.llm_model_name, "from_file");
        assert_eq!(config.output_path, "out/answers.json");
        assert_eq!(config.retry_delays_ms, vec![500]);
        assert_eq!(config.max_attempts, 3);

        // 环境变量覆盖配置文件
        std::env::set_var("LLM_MODEL_NAME", "from_env");
        std::env::set_var("RETRY_DELAYS_MS", "10, 20");
        std::env::set_var("MAX_ATTEMPTS", "not-a-number");
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.llm_model_name, "from_env");
        assert_eq!(config.retry_delays_ms, vec![10, 20]);
        // 无法解析的值保留原值
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.concurrency, 4);

        // 没有配置文件时从默认值开始
        let config = Config::load(None).unwrap();
        assert_eq!(config.llm_model_name, "from_env");
        assert_eq!(config.concurrency, 10);

        // 覆盖后的值同样要通过检查
        std::env::set_var("CONCURRENCY", "0");
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("concurrency"));

        for name in ["LLM_MODEL_NAME", "RETRY_DELAYS_MS", "MAX_ATTEMPTS", "CONCURRENCY"] {
            std::env::remove_var(name);
        }

        let missing = dir.path().join("missing.toml");
        let err = Config::load(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }

    #[test]
    fn test_parse_delay_list() {
        assert_eq!(parse_delay_list("1000, 2000"), Some(vec![1000, 2000]));
        assert_eq!(parse_delay_list("1000,abc"), None);
    }
}
