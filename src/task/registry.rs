//! 任务注册表
//!
//! 启动时显式构建（名称 → Task），再以依赖注入方式交给编排器；不使用进程级全局注册状态。

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::task::{CompressionTask, PrimesTask, PythonRunner, SortingTask, SudokuTask, Task};

/// 任务注册表：按小写名称存储 Arc<dyn Task>，支持 register / get / names
#[derive(Default, Clone)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, Arc<dyn Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 内置任务：sorting / primes / sudoku / compression，共用同一个 Python 执行器
    pub fn builtin(runner: PythonRunner) -> Self {
        let mut registry = Self::new();
        registry.register("sorting", SortingTask::new(runner.clone()));
        registry.register("primes", PrimesTask::new(runner.clone()));
        registry.register("sudoku", SudokuTask::new(runner.clone()));
        registry.register("compression", CompressionTask::new(runner));
        registry
    }

    pub fn register(&mut self, name: &str, task: impl Task + 'static) {
        self.tasks.insert(name.trim().to_lowercase(), Arc::new(task));
    }

    /// 名称大小写不敏感
    pub fn get(&self, name: &str) -> Option<Arc<dyn Task>> {
        self.tasks.get(&name.trim().to_lowercase()).cloned()
    }

    /// 已注册的任务名（字典序）
    pub fn names(&self) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names_are_sorted() {
        let registry = TaskRegistry::builtin(PythonRunner::default());
        assert_eq!(
            registry.names(),
            vec!["compression", "primes", "sorting", "sudoku"]
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = TaskRegistry::builtin(PythonRunner::default());
        let task = registry.get("Sorting").expect("sorting is registered");
        assert_eq!(task.name(), "Sorting");
        assert!(registry.get("  PRIMES ").is_some());
        assert!(registry.get("tsp").is_none());
    }
}
