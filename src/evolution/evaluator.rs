//! 带超时的评估器
//!
//! 适应度函数在阻塞线程池上运行（spawn_blocking + Handle::block_on），与调用方隔离；
//! 同时启动一次性看门狗：到期即取消本次评估的 token。会让出执行权的评估随之被丢弃（子进程被杀），
//! 从不让出的进程内计算则被放弃，调用方在 deadline 处立即得到 Timeout，迟到的结果一律作废。
//! 正常完成时看门狗立即解除，不会在之后无关的评估中误触发。evaluate 需要 &mut self，同一评估器上不可能并发评估。

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::task::{EvalContext, Task, TaskError};

#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("evaluation exceeded {secs}s")]
    Timeout { secs: f64 },

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("fitness {0} is outside [0, 1]")]
    InvalidFitness(f64),

    #[error("evaluation panicked: {0}")]
    Panicked(String),
}

/// 一次性看门狗；drop 即解除
struct Watchdog(JoinHandle<()>);

impl Watchdog {
    fn arm(deadline: Duration, token: CancellationToken) -> Self {
        Self(tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            token.cancel();
        }))
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[derive(Debug, Clone)]
pub struct TimeoutEvaluator {
    deadline: Duration,
}

impl TimeoutEvaluator {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// 在 deadline 内评估 code，返回 [0, 1] 内的适应度（-0.0 归一为 0.0）
    pub async fn evaluate(
        &mut self,
        task: Arc<dyn Task>,
        code: &str,
    ) -> Result<f64, EvaluationError> {
        let token = CancellationToken::new();
        let ctx = EvalContext::new(token.clone(), self.deadline);
        let started = Instant::now();
        let watchdog = Watchdog::arm(self.deadline, token.clone());

        let runtime = tokio::runtime::Handle::current();
        let code = code.to_string();
        let worker = tokio::task::spawn_blocking(move || {
            runtime.block_on(async move {
                tokio::select! {
                    r = task.evaluate(&code, &ctx) => Some(r),
                    _ = ctx.cancelled() => None,
                }
            })
        });

        // 超时后丢弃 JoinHandle 即放弃该评估
        let joined = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            r = worker => Some(r),
        };
        let in_time = started.elapsed() <= self.deadline;
        drop(watchdog);

        let timeout = || EvaluationError::Timeout {
            secs: self.deadline.as_secs_f64(),
        };
        let result = match joined {
            None | Some(Ok(None)) => return Err(timeout()),
            Some(Err(e)) => return Err(EvaluationError::Panicked(e.to_string())),
            Some(Ok(Some(result))) => result,
        };
        if !in_time {
            return Err(timeout());
        }
        match result {
            Err(TaskError::Cancelled) => Err(timeout()),
            Err(e) => Err(e.into()),
            Ok(fitness) if (0.0..=1.0).contains(&fitness) => Ok(fitness + 0.0),
            Ok(fitness) => Err(EvaluationError::InvalidFitness(fitness)),
        }
    }
}
