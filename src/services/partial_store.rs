//! 中间结果存储 - 业务能力层
//!
//! 只负责"记住已完成的题目并写盘"，不关心谁在调用。
//!
//! 文件格式是与输入顺序对齐的 JSON 数组：已完成的位置是
//! `{"output": "..."}`，尚未完成的位置是 `null`。每次保存都整体重写，
//! 并通过临时文件 + rename 保证磁盘上的文件始终是合法的 JSON。

use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use crate::error::PersistError;
use crate::models::AnswerRecord;
use crate::utils::fs::write_atomic;

/// 中间结果集合
///
/// 会被多个 worker 共享，调用方负责用锁保护（见 `BatchRunner`）。
#[derive(Debug)]
pub struct PartialStore {
    path: PathBuf,
    slots: Vec<Option<AnswerRecord>>,
    completed: usize,
    dirty: bool,
    save_failures: usize,
}

impl PartialStore {
    /// 创建一个全部未完成的集合
    pub fn new(path: impl Into<PathBuf>, total: usize) -> Self {
        Self::with_slots(path, vec![None; total])
    }

    /// 用已有的结果（例如上次运行留下的中间文件）初始化
    pub fn with_slots(path: impl Into<PathBuf>, slots: Vec<Option<AnswerRecord>>) -> Self {
        let completed = slots.iter().filter(|slot| slot.is_some()).count();
        Self {
            path: path.into(),
            slots,
            completed,
            dirty: false,
            save_failures: 0,
        }
    }

    /// 读取中间结果文件，文件不存在时返回 `None`
    pub async fn load(path: &Path) -> Result<Option<Vec<Option<AnswerRecord>>>, PersistError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistError::ReadFailed {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        let slots = serde_json::from_str(&content).map_err(|source| PersistError::ParseFailed {
            path: path.display().to_string(),
            source,
        })?;

        Ok(Some(slots))
    }

    /// 记录一道题的结果
    ///
    /// 结果一旦写入就不会再被修改；对同一位置的重复写入会被忽略并返回 `false`。
    pub fn record(&mut self, position: usize, record: AnswerRecord) -> bool {
        match self.slots.get_mut(position) {
            Some(slot) if slot.is_none() => {
                *slot = Some(record);
                self.completed += 1;
                self.dirty = true;
                true
            }
            Some(_) => {
                warn!("第 {} 题已有结果，忽略重复写入", position + 1);
                false
            }
            None => {
                warn!(
                    "题目位置 {} 超出范围 (共 {} 题)，忽略",
                    position + 1,
                    self.slots.len()
                );
                false
            }
        }
    }

    /// 整体重写中间结果文件
    ///
    /// 写入失败时内存中的结果保持不变，下一次保存会再次写入全部内容。
    pub async fn save(&mut self) -> Result<(), PersistError> {
        let bytes = serde_json::to_vec_pretty(&self.slots).map_err(|source| {
            PersistError::Serialize {
                path: self.path.display().to_string(),
                source,
            }
        })?;

        match write_atomic(&self.path, bytes).await {
            Ok(()) => {
                self.dirty = false;
                debug!("中间结果已保存: {}", self.path.display());
                Ok(())
            }
            Err(e) => {
                self.save_failures += 1;
                error!(
                    "❌ 中间结果保存失败 (累计 {} 次)，内存中的结果已保留: {}",
                    self.save_failures, e
                );
                Err(e)
            }
        }
    }

    /// 如果有未写盘的结果则保存
    pub async fn flush(&mut self) -> Result<(), PersistError> {
        if self.dirty {
            self.save().await
        } else {
            Ok(())
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn total(&self) -> usize {
        self.slots.len()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn save_failures(&self) -> usize {
        self.save_failures
    }

    /// 某个位置是否已经有结果
    pub fn is_filled(&self, position: usize) -> bool {
        matches!(self.slots.get(position), Some(Some(_)))
    }

    /// 转成最终结果列表，未完成的位置用空答案补齐
    pub fn to_records(&self) -> Vec<AnswerRecord> {
        self.slots
            .iter()
            .map(|slot| slot.clone().unwrap_or_default())
            .collect()
    }
}
