//! 结果持久化
//!
//! 每次运行的最优个体写入独立目录：`solution.py`（可直接运行的候选代码）与 `meta.json`（适应度、反馈、时间、任务名）。

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::evolution::Individual;

pub const CODE_FILE: &str = "solution.py";
pub const META_FILE: &str = "meta.json";

/// meta.json 的内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub fitness: f64,
    pub feedback: String,
    /// RFC 3339
    pub timestamp: String,
    pub task_name: String,
}

/// `<root>/<task>_<YYYYmmdd_HHMMSS>_<8 位 uuid>`
pub fn result_dir(root: &Path, task_name: &str, now: DateTime<Local>) -> PathBuf {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    root.join(format!(
        "{}_{}_{}",
        task_name.to_lowercase(),
        now.format("%Y%m%d_%H%M%S"),
        &suffix[..8]
    ))
}

/// 写入代码与元数据；目录不存在时自动创建，返回该目录
pub fn save_result(
    individual: &Individual,
    output_dir: impl AsRef<Path>,
    task_name: &str,
) -> anyhow::Result<PathBuf> {
    let dir = output_dir.as_ref().to_path_buf();
    std::fs::create_dir_all(&dir)?;

    std::fs::write(dir.join(CODE_FILE), &individual.code)?;

    let meta = ResultMetadata {
        fitness: individual.fitness,
        feedback: individual.feedback.clone(),
        timestamp: Local::now().to_rfc3339(),
        task_name: task_name.to_string(),
    };
    std::fs::write(dir.join(META_FILE), serde_json::to_string_pretty(&meta)?)?;

    tracing::info!(path = %dir.display(), fitness = individual.fitness, "Result saved");
    Ok(dir)
}

/// 读回 meta.json
pub fn load_metadata(dir: impl AsRef<Path>) -> anyhow::Result<ResultMetadata> {
    let data = std::fs::read_to_string(dir.as_ref().join(META_FILE))?;
    Ok(serde_json::from_str(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_save_writes_code_and_metadata() {
        let root = tempfile::tempdir().unwrap();
        let mut best = Individual::new("def sort_list(xs):\n    return sorted(xs)\n");
        best.fitness = 0.75;
        best.feedback = "Failed on [-1, 5, 0]".to_string();

        let dir = save_result(&best, root.path().join("nested/run"), "Sorting").unwrap();
        assert!(dir.ends_with("nested/run"));

        let code = std::fs::read_to_string(dir.join(CODE_FILE)).unwrap();
        assert_eq!(code, best.code);

        let meta = load_metadata(&dir).unwrap();
        assert_eq!(meta.fitness, 0.75);
        assert_eq!(meta.feedback, "Failed on [-1, 5, 0]");
        assert_eq!(meta.task_name, "Sorting");
        assert!(DateTime::parse_from_rfc3339(&meta.timestamp).is_ok());
    }

    #[test]
    fn test_result_dir_name() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let dir = result_dir(Path::new("results"), "Primes", now);
        let name = dir.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("primes_20240309_140507_"), "{name}");
        assert_eq!(name.len(), "primes_20240309_140507_".len() + 8);
        assert_ne!(dir, result_dir(Path::new("results"), "Primes", now));
    }
}
