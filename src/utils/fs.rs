//! 文件写入工具
//!
//! 结果文件随时可能被读取（或进程随时可能被杀掉），
//! 所以一律先写同目录下的临时文件，再 rename 覆盖目标文件。

use crate::error::PersistError;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// 原子地用 `bytes` 替换 `path` 的内容
///
/// 实际的 IO 在 `spawn_blocking` 中执行，不占用异步 worker 线程。
pub async fn write_atomic(path: &Path, bytes: Vec<u8>) -> Result<(), PersistError> {
    let target: PathBuf = path.to_path_buf();
    let display = path.display().to_string();

    tokio::task::spawn_blocking(move || write_atomic_blocking(&target, &bytes))
        .await
        .map_err(|e| PersistError::TaskFailed {
            path: display.clone(),
            message: e.to_string(),
        })?
        .map_err(|source| PersistError::write_failed(display, source))
}

/// 同步版本
pub fn write_atomic_blocking(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    // 临时文件必须和目标在同一个文件系统上，rename 才是原子的
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
