use crate::error::{DatasetError, PersistError};
use crate::models::question::{AnswerRecord, Question};
use crate::utils::fs::write_atomic;
use std::path::Path;
use tokio::fs;

/// 从 JSON 文件加载题目列表
///
/// 文件内容是对象数组，题目文本在 `input` 字段，`id` 可选。
/// 没有 id 的题目使用其在数组中的下标作为 id。
pub async fn load_questions(path: &Path) -> Result<Vec<Question>, DatasetError> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|source| DatasetError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;

    let mut questions: Vec<Question> =
        serde_json::from_str(&content).map_err(|source| DatasetError::ParseFailed {
            path: path.display().to_string(),
            source,
        })?;

    for (index, question) in questions.iter_mut().enumerate() {
        if question.id.is_none() {
            question.id = Some(index.to_string());
        }
    }

    tracing::info!(
        "成功加载 {} 道题目: {}",
        questions.len(),
        path.file_name().unwrap_or_default().to_string_lossy()
    );

    Ok(questions)
}

/// 写出最终结果列表（整体原子替换）
pub async fn write_answers(path: &Path, answers: &[AnswerRecord]) -> Result<(), PersistError> {
    let bytes = serde_json::to_vec_pretty(answers).map_err(|source| PersistError::Serialize {
        path: path.display().to_string(),
        source,
    })?;
    write_atomic(path, bytes).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_questions_fills_missing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questions.json");
        std::fs::write(
            &path,
            r#"[{"input": "What is 6*7?"}, {"id": "abc", "input": "Capital of France?"}, {}]"#,
        )
        .unwrap();

        let questions = load_questions(&path).await.unwrap();

        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0], Question::new("0", "What is 6*7?"));
        assert_eq!(questions[1].label(), "abc");
        assert_eq!(questions[2], Question::new("2", ""));
    }

    #[tokio::test]
    async fn test_load_questions_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_questions(&dir.path().join("nope.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, DatasetError::ReadFailed { .. }));
    }

    #[tokio::test]
    async fn test_load_questions_rejects_non_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questions.json");
        std::fs::write(&path, r#"{"input": "not a list"}"#).unwrap();

        let err = load_questions(&path).await.unwrap_err();
        assert!(matches!(err, DatasetError::ParseFailed { .. }));
    }

    #[tokio::test]
    async fn test_write_answers_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("answers.json");
        let answers = vec![AnswerRecord::from(Some("42".to_string())), AnswerRecord::empty()];

        write_answers(&path, &answers).await.unwrap();

        let reloaded: Vec<AnswerRecord> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reloaded, answers);
    }
}
