//! 运行编排：任务查找 → 配置合并 → 创建 Oracle → 进化 → 保存结果
//!
//! 启动阶段的失败（未知任务、Oracle 初始化失败、非法配置）在任何进化工作开始前返回。

use std::path::PathBuf;
use std::sync::Arc;

use tracing::Instrument;

use crate::config::{load_config, AppConfig};
use crate::core::EvolveError;
use crate::evolution::{EvolutionConfig, EvolutionEngine, EvolutionOutcome, Telemetry};
use crate::llm::create_llm;
use crate::storage;
use crate::task::{PythonRunner, TaskRegistry};

/// 一次 `run` 的参数；None 表示沿用配置文件 / 环境变量中的值
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub task_name: String,
    pub generations: Option<usize>,
    pub population_size: Option<usize>,
    /// `provider/model`
    pub model: Option<String>,
    /// 结果根目录
    pub output_dir: Option<PathBuf>,
}

impl RunRequest {
    pub fn new(task_name: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub task_name: String,
    pub outcome: EvolutionOutcome,
    /// 最优个体的保存目录
    pub result_dir: PathBuf,
}

/// 加载运行配置。显式指定的文件必须存在且可解析，否则返回错误；
/// 未指定时默认配置加载失败只告警并回落到内置默认值
pub fn load_run_config(config_path: Option<PathBuf>) -> Result<AppConfig, EvolveError> {
    match config_path {
        Some(path) => {
            if !path.is_file() {
                return Err(EvolveError::InvalidConfig(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            Ok(load_config(Some(path))?)
        }
        None => Ok(load_config(None).unwrap_or_else(|e| {
            tracing::warn!("Config load failed ({}), using defaults", e);
            AppConfig::default()
        })),
    }
}

/// 内置任务注册表，解释器取自 [runner] 配置
pub fn build_registry(cfg: &AppConfig) -> TaskRegistry {
    TaskRegistry::builtin(PythonRunner::new(cfg.runner.python.clone()))
}

pub fn list_tasks(registry: &TaskRegistry) -> Vec<String> {
    registry.names()
}

/// 执行一次完整的进化运行并保存最优个体
pub async fn run_evolution(
    cfg: &AppConfig,
    registry: &TaskRegistry,
    request: RunRequest,
    telemetry: Arc<dyn Telemetry>,
) -> Result<RunReport, EvolveError> {
    let run_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("run", %run_id, task = %request.task_name);
    run_inner(cfg, registry, request, telemetry).instrument(span).await
}

async fn run_inner(
    cfg: &AppConfig,
    registry: &TaskRegistry,
    request: RunRequest,
    telemetry: Arc<dyn Telemetry>,
) -> Result<RunReport, EvolveError> {
    let task = registry
        .get(&request.task_name)
        .ok_or_else(|| EvolveError::UnknownTask {
            name: request.task_name.clone(),
            available: registry.names().join(", "),
        })?;

    let mut section = cfg.evolution.clone();
    if let Some(generations) = request.generations {
        section.generations = generations;
    }
    if let Some(population_size) = request.population_size {
        section.population_size = population_size;
    }
    let config = EvolutionConfig::try_from(&section)?;

    let model = request.model.as_deref().unwrap_or(&cfg.llm.model);
    let llm = create_llm(model, &cfg.llm)?;
    tracing::info!(
        task = task.name(),
        model,
        generations = config.generations,
        population_size = config.population_size,
        "Starting evolution"
    );

    let mut engine = EvolutionEngine::new(llm, task.clone(), config)?.with_telemetry(telemetry);
    let outcome = engine.run().await?;
    tracing::info!(
        fitness = outcome.best.fitness,
        generations_run = outcome.generations_run,
        termination = ?outcome.termination,
        "Evolution finished"
    );

    let root = request
        .output_dir
        .unwrap_or_else(|| cfg.output.results_dir.clone());
    let dir = storage::result_dir(&root, task.name(), chrono::Local::now());
    let result_dir =
        storage::save_result(&outcome.best, &dir, task.name()).map_err(EvolveError::Storage)?;

    Ok(RunReport {
        task_name: task.name().to_string(),
        outcome,
        result_dir,
    })
}
