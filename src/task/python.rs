//! Python 候选代码执行器
//!
//! 每次评估启动一个独立解释器进程：`python3 -c <harness>`，stdin 传入 JSON `{code, entry, input}`。
//! harness 在全新命名空间里 exec 候选代码、调用入口函数，并输出一行带哨兵前缀的 JSON 结果。
//! 进程随评估上下文取消而被杀掉（kill_on_drop），只施加墙钟约束，不做 CPU/内存/网络隔离。

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::task::{EvalContext, TaskError};

/// harness 输出行的前缀，用于与候选代码自己的 print 区分
pub const RESULT_SENTINEL: &str = "__CODEVOLVE_RESULT__";

/// 诊断文本上限（字符）
const MAX_DIAGNOSTIC_CHARS: usize = 600;

/// 每个输出流最多读取的字节数；超出视为失败
pub const MAX_OUTPUT_BYTES: u64 = 1 << 20;

/// 通用驱动：各任务的 harness 先定义 `_run(ns, entry, data)`，再拼接此段
const DRIVER: &str = r#"
import json as _json
import sys as _sys

def _emit(obj):
    _sys.stdout.write("\n__CODEVOLVE_RESULT__" + _json.dumps(obj, default=repr) + "\n")
    _sys.stdout.flush()

_payload = _json.loads(_sys.stdin.read())
_ns = {"__name__": "candidate"}
try:
    exec(_payload["code"], _ns)
    _emit({"ok": True, "value": _run(_ns, _payload["entry"], _payload["input"])})
except BaseException as _e:
    _emit({"ok": False, "error": type(_e).__name__ + ": " + str(_e)})
"#;

static TOP_LEVEL_DEF_RE: OnceLock<Regex> = OnceLock::new();

/// 去掉 Markdown 代码围栏（```python / ```）
pub fn strip_code_fences(code: &str) -> String {
    code.replace("```python", "").replace("```", "").trim().to_string()
}

/// 候选代码中所有顶层 `def` 的函数名（按出现顺序）
pub fn top_level_functions(code: &str) -> Vec<String> {
    let re = TOP_LEVEL_DEF_RE.get_or_init(|| {
        Regex::new(r"(?m)^(?:async\s+)?def\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(")
            .expect("top-level def pattern is valid")
    });
    re.captures_iter(code)
        .map(|c| c[1].to_string())
        .collect()
}

/// 入口提取约定：名字包含 hint 的第一个顶层函数，否则第一个顶层函数
pub fn find_entry_point(code: &str, hint: Option<&str>) -> Result<String, TaskError> {
    let functions = top_level_functions(code);
    let preferred = hint.and_then(|h| {
        let h = h.to_lowercase();
        functions.iter().find(|name| name.to_lowercase().contains(&h))
    });
    preferred
        .or_else(|| functions.first())
        .cloned()
        .ok_or_else(|| TaskError::Extraction("No function found".to_string()))
}

#[derive(Deserialize)]
struct HarnessEnvelope {
    ok: bool,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// 从 stdout 中找最后一条哨兵行并解析；没有哨兵行返回 None
pub fn parse_harness_output(stdout: &str) -> Option<Result<Value, TaskError>> {
    let line = stdout
        .lines()
        .rev()
        .find_map(|l| l.strip_prefix(RESULT_SENTINEL))?;

    let envelope: HarnessEnvelope = match serde_json::from_str(line) {
        Ok(e) => e,
        Err(e) => {
            return Some(Err(TaskError::Execution(format!(
                "unreadable harness result: {e}"
            ))))
        }
    };

    Some(if envelope.ok {
        Ok(envelope.value.unwrap_or(Value::Null))
    } else {
        Err(TaskError::Execution(preview(
            envelope.error.as_deref().unwrap_or("unknown error"),
        )))
    })
}

/// 截取末尾 MAX_DIAGNOSTIC_CHARS 个字符（traceback 的关键信息在末尾）
fn preview(s: &str) -> String {
    let s = s.trim();
    let count = s.chars().count();
    if count > MAX_DIAGNOSTIC_CHARS {
        let tail: String = s.chars().skip(count - MAX_DIAGNOSTIC_CHARS).collect();
        format!("...{tail}")
    } else {
        s.to_string()
    }
}

/// 读取子进程输出，最多 MAX_OUTPUT_BYTES 字节
async fn read_capped<R>(reader: Option<R>, stream: &str) -> Result<Vec<u8>, TaskError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(reader) = reader {
        let mut limited = reader.take(MAX_OUTPUT_BYTES + 1);
        limited
            .read_to_end(&mut buf)
            .await
            .map_err(|e| TaskError::Execution(format!("failed to read candidate {stream}: {e}")))?;
    }
    if buf.len() as u64 > MAX_OUTPUT_BYTES {
        return Err(TaskError::Execution(format!(
            "output limit exceeded: {stream} over {MAX_OUTPUT_BYTES} bytes"
        )));
    }
    Ok(buf)
}

/// Python 解释器执行器
#[derive(Debug, Clone)]
pub struct PythonRunner {
    interpreter: PathBuf,
}

impl Default for PythonRunner {
    fn default() -> Self {
        Self::new("python3")
    }
}

impl PythonRunner {
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    /// 以 harness 运行候选代码，返回 `_run` 的返回值；上下文取消时杀掉子进程并返回 Cancelled
    pub async fn run(
        &self,
        harness: &str,
        code: &str,
        entry: &str,
        input: Value,
        ctx: &EvalContext,
    ) -> Result<Value, TaskError> {
        let script = format!("{harness}\n{DRIVER}");
        let payload = serde_json::json!({ "code": code, "entry": entry, "input": input }).to_string();

        let mut child = Command::new(&self.interpreter)
            .arg("-c")
            .arg(&script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TaskError::Interpreter(format!("{}: {e}", self.interpreter.display())))?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // 子进程提前退出时写入会失败，错误信息以 stderr 为准
                if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                    tracing::debug!(error = %e, "candidate stdin closed early");
                }
            }
            Ok::<(), TaskError>(())
        };
        // 任一输出流超限即短路返回，child 随函数返回被 drop 并杀掉
        let exchange = async {
            let ((), stdout, stderr) = tokio::try_join!(
                feed,
                read_capped(stdout, "stdout"),
                read_capped(stderr, "stderr")
            )?;
            let status = child
                .wait()
                .await
                .map_err(|e| TaskError::Execution(format!("failed to collect candidate output: {e}")))?;
            Ok::<_, TaskError>(Output { status, stdout, stderr })
        };

        let output = tokio::select! {
            out = exchange => out?,
            _ = ctx.cancelled() => return Err(TaskError::Cancelled),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_harness_output(&stdout) {
            Some(result) => result,
            None => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(TaskError::Execution(format!(
                    "candidate exited without a result ({}): {}",
                    output.status,
                    preview(&stderr)
                )))
            }
        }
    }
}
