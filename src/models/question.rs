use serde::{Deserialize, Serialize};

/// 一道待回答的题目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// 题目标识；数据集中没有 id 时使用位置下标
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,
    /// 题目文本
    #[serde(rename = "input", default)]
    pub text: String,
}

impl Question {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            text: text.into(),
        }
    }

    /// 日志里显示用的标识
    pub fn label(&self) -> &str {
        self.id.as_deref().unwrap_or("?")
    }
}

/// 单道题目的结果记录，`output` 为空字符串表示没有得到答案
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub output: String,
}

impl AnswerRecord {
    /// 空答案（所有尝试都失败）
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }
}

impl From<Option<String>> for AnswerRecord {
    fn from(answer: Option<String>) -> Self {
        Self {
            output: answer.unwrap_or_default(),
        }
    }
}

// id 既可能是字符串也可能是整数
fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer question id")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(IdVisitor)
}
