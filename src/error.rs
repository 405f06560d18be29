use std::time::Duration;
use thiserror::Error;

/// 应用程序错误类型
///
/// 只有"灾难性"的情况才会以这个类型上抛到 main：
/// 数据集无法读取、配置文件错误、最终结果文件无法写入。
/// 单道题目的失败永远以空答案的形式表示，不会变成 `AppError`。
#[derive(Debug, Error)]
pub enum AppError {
    /// 数据集错误
    #[error("数据集错误: {0}")]
    Dataset(#[from] DatasetError),
    /// 结果文件写入错误
    #[error("持久化错误: {0}")]
    Persist(#[from] PersistError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 推理接口（传输层）错误
///
/// 所有变体对重试逻辑来说都是一样的：消耗一次尝试机会。
#[derive(Debug, Error)]
pub enum TransportError {
    /// 请求失败（网络错误、响应解析失败）
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    Http {
        model: String,
        #[source]
        source: reqwest::Error,
    },
    /// 非 2xx 状态码
    #[error("LLM API返回错误状态 {status} (模型: {model}): {body}")]
    Status {
        model: String,
        status: u16,
        body: String,
    },
    /// 单次请求超时
    #[error("LLM API调用超时 ({timeout:?})")]
    Timeout { timeout: Duration },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 请求构建失败
    #[error("构建请求失败: {0}")]
    Build(String),
}

/// 数据集读取错误
#[derive(Debug, Error)]
pub enum DatasetError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 解析失败
    #[error("JSON解析失败 ({path}): {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 结果文件写入错误
#[derive(Debug, Error)]
pub enum PersistError {
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 读取已有结果失败
    #[error("读取结果文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 结果文件内容无法解析
    #[error("结果文件解析失败 ({path}): {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// 结果序列化失败
    #[error("结果序列化失败 ({path}): {source}")]
    Serialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// 整个运行期间中间结果都没能写盘
    #[error("中间结果未能保存 ({path})，累计失败 {failures} 次")]
    PartialUnsaved { path: String, failures: usize },
    /// 后台写入任务异常退出
    #[error("写入任务异常 ({path}): {message}")]
    TaskFailed { path: String, message: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 配置值不合法
    #[error("配置项 {name} 不合法: {reason}")]
    Invalid { name: String, reason: String },
}

// ========== 便捷构造函数 ==========

impl PersistError {
    /// 创建文件写入错误
    pub fn write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        PersistError::WriteFailed {
            path: path.into(),
            source,
        }
    }
}

impl TransportError {
    /// 创建 LLM API 调用错误
    pub fn http(model: impl Into<String>, source: reqwest::Error) -> Self {
        TransportError::Http {
            model: model.into(),
            source,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
