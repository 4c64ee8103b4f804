//! 排序任务：四组固定输入，适应度 = 通过用例数 / 用例总数

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::task::python::{find_entry_point, strip_code_fences, PythonRunner};
use crate::task::{EvalContext, Task, TaskError};

const HARNESS: &str = r#"
def _run(ns, entry, cases):
    fn = ns[entry]
    # 传副本，避免原地排序影响后续用例
    return [fn(list(case)) for case in cases]
"#;

const CASES: [(&[i64], &[i64]); 4] = [
    (&[3, 1, 2], &[1, 2, 3]),
    (&[5, 4, 3, 2, 1], &[1, 2, 3, 4, 5]),
    (&[], &[]),
    (&[-1, 5, 0], &[-1, 0, 5]),
];

pub struct SortingTask {
    runner: PythonRunner,
}

impl SortingTask {
    pub fn new(runner: PythonRunner) -> Self {
        Self { runner }
    }
}

/// 按用例顺序比对输出
pub(crate) fn score_outputs(outputs: &Value) -> Result<f64, TaskError> {
    let outputs = outputs
        .as_array()
        .ok_or_else(|| TaskError::WrongOutput("harness returned no case results".to_string()))?;
    let passed = CASES
        .iter()
        .zip(outputs)
        .filter(|((_, expected), got)| **got == json!(expected))
        .count();
    Ok(passed as f64 / CASES.len() as f64)
}

#[async_trait]
impl Task for SortingTask {
    fn name(&self) -> &str {
        "Sorting"
    }

    fn description(&self) -> &str {
        "Sort a list of integers in ascending order"
    }

    async fn evaluate(&self, code: &str, ctx: &EvalContext) -> Result<f64, TaskError> {
        let code = strip_code_fences(code);
        let entry = find_entry_point(&code, Some("sort"))?;
        let inputs: Vec<&[i64]> = CASES.iter().map(|(input, _)| *input).collect();
        let outputs = self
            .runner
            .run(HARNESS, &code, &entry, json!(inputs), ctx)
            .await?;
        score_outputs(&outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_cases_pass() {
        let outputs = json!([[1, 2, 3], [1, 2, 3, 4, 5], [], [-1, 0, 5]]);
        assert_eq!(score_outputs(&outputs).unwrap(), 1.0);
    }

    #[test]
    fn test_partial_credit() {
        // 忽略负数的实现只能通过前三个用例
        let outputs = json!([[1, 2, 3], [1, 2, 3, 4, 5], [], [5, 0, -1]]);
        assert_eq!(score_outputs(&outputs).unwrap(), 0.75);
    }

    #[test]
    fn test_none_results_score_zero() {
        let outputs = json!([null, null, null, null]);
        assert_eq!(score_outputs(&outputs).unwrap(), 0.0);
        assert!(score_outputs(&Value::Null).is_err());
    }
}
