//! 运行级错误
//!
//! 个体级失败（评估失败、单次 Oracle 失败）在进化循环内部就地恢复，不会出现在这里；
//! 这里只有会终止一次运行的错误。

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum EvolveError {
    #[error("Unknown task: {name} (available: {available})")]
    UnknownTask { name: String, available: String },

    #[error("Failed to initialize LLM: {0}")]
    OracleInit(#[from] LlmError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// 种子阶段一个个体都没生成（与「跑完但适应度为 0」区分）
    #[error("Evolution failed to produce any individuals")]
    NoIndividuals,

    #[error("Failed to save result: {0:#}")]
    Storage(anyhow::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}
