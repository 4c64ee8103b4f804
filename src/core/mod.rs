//! 核心编排层：运行级错误与 run / list-tasks 的装配

pub mod error;
pub mod orchestrator;

pub use error::EvolveError;
pub use orchestrator::{
    build_registry, list_tasks, load_run_config, run_evolution, RunReport, RunRequest,
};
