//! 压缩任务：compress/decompress 必须无损往返（硬约束），适应度 = 平均 (1 - 压缩比)

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::task::python::{strip_code_fences, PythonRunner};
use crate::task::{EvalContext, Task, TaskError};

const HARNESS: &str = r#"
def _run(ns, entry, texts):
    if "compress" not in ns or "decompress" not in ns:
        return None
    compress, decompress = ns["compress"], ns["decompress"]
    results = []
    for text in texts:
        data = compress(text)
        if not isinstance(data, bytes):
            raise ValueError("compress() returned " + type(data).__name__ + ", expected bytes")
        results.append({"compressed_len": len(data), "reconstructed": decompress(data)})
    return results
"#;

const PROMPT: &str = r#"
Write a Python script with two functions:
1. `compress(text: str) -> bytes`
2. `decompress(data: bytes) -> str`

The goal is to make the output of `compress` as small as possible.
Important: `decompress(compress(text))` must equal `text` exactly.

RECOMMENDATION: Use standard libraries like `zlib`, `gzip`, or `lzma` for reliable and efficient compression.
Do not implement custom algorithms unless you are sure they are lossless and handle edge cases (like Unicode) correctly.
Return ONLY the code, no markdown.
"#;

fn test_texts() -> Vec<String> {
    vec![
        "Hello World".repeat(10),
        "A".repeat(1000),
        "Random string with symbols: !@#$%^&*()_+".to_string(),
        "Python is a high-level, general-purpose programming language. ".repeat(5),
    ]
}

#[derive(Debug, Deserialize)]
pub(crate) struct CaseReport {
    compressed_len: usize,
    reconstructed: Value,
}

fn snippet(s: &str) -> String {
    if s.chars().count() > 20 {
        format!("{}...", s.chars().take(20).collect::<String>())
    } else {
        s.to_string()
    }
}

pub(crate) fn score_cases(texts: &[String], reports: &[CaseReport]) -> Result<f64, TaskError> {
    if reports.len() != texts.len() {
        return Err(TaskError::WrongOutput(format!(
            "expected {} results, got {}",
            texts.len(),
            reports.len()
        )));
    }

    let mut total = 0.0;
    for (text, report) in texts.iter().zip(reports) {
        if report.reconstructed.as_str() != Some(text.as_str()) {
            let got = match &report.reconstructed {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Err(TaskError::WrongOutput(format!(
                "Decompression mismatch: Expected '{}', Got '{}'",
                snippet(text),
                snippet(&got)
            )));
        }
        let original_len = text.len();
        if original_len == 0 {
            continue;
        }
        let ratio = report.compressed_len as f64 / original_len as f64;
        total += (1.0 - ratio).clamp(0.0, 1.0);
    }
    Ok(total / texts.len() as f64)
}

pub struct CompressionTask {
    runner: PythonRunner,
}

impl CompressionTask {
    pub fn new(runner: PythonRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Task for CompressionTask {
    fn name(&self) -> &str {
        "Compression"
    }

    fn description(&self) -> &str {
        "Write two functions:\n\
         1. `compress(text: str) -> bytes`: Compresses the input string.\n\
         2. `decompress(data: bytes) -> str`: Decompresses the data back to the original string.\n\
         Goal: Minimize the size of the compressed data while maintaining perfect reconstruction."
    }

    fn initial_prompt(&self) -> String {
        PROMPT.to_string()
    }

    async fn evaluate(&self, code: &str, ctx: &EvalContext) -> Result<f64, TaskError> {
        let code = strip_code_fences(code);
        let texts = test_texts();
        let value = self
            .runner
            .run(HARNESS, &code, "compress", json!(texts), ctx)
            .await?;
        if value.is_null() {
            // 缺少 compress / decompress
            return Ok(0.0);
        }
        let reports: Vec<CaseReport> = serde_json::from_value(value)
            .map_err(|e| TaskError::WrongOutput(format!("unexpected compression report: {e}")))?;
        score_cases(&texts, &reports)
    }
}
