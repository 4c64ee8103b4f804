//! 素数任务：正确性为硬门槛，速度按基线折算为 [0.1, 1.0]

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::task::python::{find_entry_point, strip_code_fences, PythonRunner};
use crate::task::{EvalContext, Task, TaskError};

const HARNESS: &str = r#"
import time

def _run(ns, entry, params):
    fn = ns[entry]
    small = fn(params["small_n"])
    start = time.perf_counter()
    large = fn(params["large_n"])
    elapsed = time.perf_counter() - start
    count = len(large) if hasattr(large, "__len__") else -1
    return {"small": list(small) if isinstance(small, (list, tuple)) else small,
            "large_count": count, "elapsed": elapsed}
"#;

const SMALL_N: u64 = 30;
const REFERENCE: [u64; 10] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29];
const LARGE_N: u64 = 10_000;
/// 小于 10000 的素数个数
const LARGE_COUNT: i64 = 1229;
/// 筛法基线耗时（秒）；不慢于此即满分
const TARGET_SECS: f64 = 0.002;
/// 结果正确时的最低分
const CORRECT_FLOOR: f64 = 0.1;

#[derive(Debug, Deserialize)]
pub(crate) struct PrimesReport {
    small: Value,
    large_count: i64,
    elapsed: f64,
}

pub(crate) fn score_report(report: &PrimesReport) -> f64 {
    if report.small != json!(REFERENCE) {
        return 0.0;
    }
    if report.large_count != LARGE_COUNT {
        return CORRECT_FLOOR;
    }
    let elapsed = if report.elapsed.is_finite() {
        report.elapsed
    } else {
        f64::MAX
    };
    (TARGET_SECS / elapsed.max(TARGET_SECS)).clamp(CORRECT_FLOOR, 1.0)
}

pub struct PrimesTask {
    runner: PythonRunner,
}

impl PrimesTask {
    pub fn new(runner: PythonRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Task for PrimesTask {
    fn name(&self) -> &str {
        "Primes"
    }

    fn description(&self) -> &str {
        "Write a function `get_primes(n: int) -> list[int]` that returns a list of all prime numbers less than n. The function must be EFFICIENT."
    }

    async fn evaluate(&self, code: &str, ctx: &EvalContext) -> Result<f64, TaskError> {
        let code = strip_code_fences(code);
        let entry = find_entry_point(&code, Some("prime"))?;
        let value = self
            .runner
            .run(
                HARNESS,
                &code,
                &entry,
                json!({ "small_n": SMALL_N, "large_n": LARGE_N }),
                ctx,
            )
            .await?;
        let report: PrimesReport = serde_json::from_value(value)
            .map_err(|e| TaskError::WrongOutput(format!("unexpected primes report: {e}")))?;
        Ok(score_report(&report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(small: Value, large_count: i64, elapsed: f64) -> PrimesReport {
        PrimesReport {
            small,
            large_count,
            elapsed,
        }
    }

    #[test]
    fn test_wrong_small_answer_is_zero() {
        assert_eq!(score_report(&report(json!([2, 3, 5]), 1229, 0.001)), 0.0);
        assert_eq!(score_report(&report(Value::Null, 1229, 0.001)), 0.0);
    }

    #[test]
    fn test_wrong_large_count_is_floor() {
        assert_eq!(score_report(&report(json!(REFERENCE), 1228, 0.001)), 0.1);
    }

    #[test]
    fn test_speed_scaling() {
        assert_eq!(score_report(&report(json!(REFERENCE), 1229, 0.001)), 1.0);
        let ten_x_slower = score_report(&report(json!(REFERENCE), 1229, 0.02));
        assert!((ten_x_slower - 0.1).abs() < 1e-9);
        let four_x_slower = score_report(&report(json!(REFERENCE), 1229, 0.008));
        assert!((four_x_slower - 0.25).abs() < 1e-9);
        // 极慢的正确实现保底 0.1
        assert_eq!(score_report(&report(json!(REFERENCE), 1229, 3.0)), 0.1);
    }
}
