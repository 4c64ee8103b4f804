//! Codevolve - LLM 驱动的程序进化搜索
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 运行级错误与 run / list-tasks 编排
//! - **evolution**: 个体与种群、带超时的评估器、进化循环、每代汇总
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Ollama / Gemini / Mock）与 Oracle
//! - **observability**: tracing 初始化
//! - **storage**: 最优个体持久化
//! - **task**: 适应度契约、Python 执行器与内置任务

pub mod config;
pub mod core;
pub mod evolution;
pub mod llm;
pub mod observability;
pub mod storage;
pub mod task;

pub use crate::core::EvolveError;
pub use evolution::{EvolutionConfig, EvolutionEngine, EvolutionOutcome, Individual};
pub use task::{Task, TaskRegistry};
