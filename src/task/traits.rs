//! 任务契约：适应度函数与 Prompt 模板
//!
//! 每个任务必须提供 name / description / evaluate；initial_prompt 与 mutation_prompt 可选，
//! 未覆盖时回落到 prompts 模块中的通用模板。

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::task::prompts;

/// 适应度函数失败的原因（其 Display 即写入个体 feedback 的诊断文本）
#[derive(Error, Debug)]
pub enum TaskError {
    /// 无法从候选文本中找到入口
    #[error("{0}")]
    Extraction(String),

    /// 候选代码运行时抛出异常
    #[error("{0}")]
    Execution(String),

    /// 运行成功但输出不符合任务约定
    #[error("{0}")]
    WrongOutput(String),

    #[error("Failed to start interpreter: {0}")]
    Interpreter(String),

    #[error("Evaluation cancelled")]
    Cancelled,
}

/// 单次评估的上下文：看门狗触发时 token 被取消，任务应尽快放弃（子进程会被杀掉）
#[derive(Debug, Clone)]
pub struct EvalContext {
    cancel: CancellationToken,
    deadline: Duration,
}

impl EvalContext {
    pub fn new(cancel: CancellationToken, deadline: Duration) -> Self {
        Self { cancel, deadline }
    }

    /// 不受限的上下文（直接调用 evaluate 时使用）
    pub fn unbounded() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Duration::MAX,
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 等待取消信号
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// 任务 trait：名称、问题描述、适应度函数（0.0 ~ 1.0，1.0 表示完全正确且最优）
#[async_trait]
pub trait Task: Send + Sync {
    /// 任务名称（用于日志与结果元数据）
    fn name(&self) -> &str;

    /// 问题的自然语言描述（用于生成初始 Prompt）
    fn description(&self) -> &str;

    /// 评估候选代码：提取入口 → 运行测试输入 → 返回 [0, 1] 内的适应度
    async fn evaluate(&self, code: &str, ctx: &EvalContext) -> Result<f64, TaskError>;

    fn initial_prompt(&self) -> String {
        prompts::initial_prompt(self.description())
    }

    fn mutation_prompt(&self, code: &str, feedback: &str, fitness: f64) -> String {
        prompts::mutation_prompt(code, feedback, fitness)
    }
}
