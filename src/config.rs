//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `CODEVOLVE__*` 覆盖（双下划线表示嵌套，如 `CODEVOLVE__EVOLUTION__POPULATION_SIZE=8`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub evolution: EvolutionSection,
    pub runner: RunnerSection,
    pub output: OutputSection,
}

/// [llm] 段：默认后端、模型标识、超时与重试
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 模型标识不带 `provider/` 前缀时使用的后端
    pub provider: String,
    /// `provider/model`，如 ollama/gemma3:4b
    pub model: String,
    /// 覆盖 provider 的默认端点
    pub base_url: Option<String>,
    pub request_timeout_secs: u64,
    pub retry: RetrySection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "ollama/gemma3:4b".to_string(),
            base_url: None,
            request_timeout_secs: 120,
            retry: RetrySection::default(),
        }
    }
}

/// [llm.retry] 段：指数退避
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub multiplier: f64,
    pub min_wait_secs: u64,
    pub max_wait_secs: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            multiplier: 2.0,
            min_wait_secs: 10,
            max_wait_secs: 60,
        }
    }
}

/// [evolution] 段：代数、种群规模、单次评估超时、系统提示词
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvolutionSection {
    pub generations: usize,
    pub population_size: usize,
    /// 单个个体单次评估的墙钟上限（秒）
    pub eval_timeout_secs: f64,
    pub seed_system_prompt: String,
    pub mutation_system_prompt: String,
}

pub const DEFAULT_SEED_SYSTEM_PROMPT: &str =
    "You are an expert Python coder. Output only valid Python code.";
pub const DEFAULT_MUTATION_SYSTEM_PROMPT: &str = "Improve the code based on feedback.";

impl Default for EvolutionSection {
    fn default() -> Self {
        Self {
            generations: 3,
            population_size: 5,
            eval_timeout_secs: 5.0,
            seed_system_prompt: DEFAULT_SEED_SYSTEM_PROMPT.to_string(),
            mutation_system_prompt: DEFAULT_MUTATION_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// [runner] 段：候选代码解释器
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerSection {
    pub python: PathBuf,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            python: PathBuf::from("python3"),
        }
    }
}

/// [output] 段：结果目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub results_dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
        }
    }
}

/// 从 config 目录加载配置，环境变量 CODEVOLVE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 CODEVOLVE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CODEVOLVE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_run() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.evolution.generations, 3);
        assert_eq!(cfg.evolution.population_size, 5);
        assert_eq!(cfg.evolution.eval_timeout_secs, 5.0);
        assert_eq!(cfg.llm.retry.max_attempts, 5);
        assert_eq!(cfg.llm.retry.min_wait_secs, 10);
        assert_eq!(cfg.llm.retry.max_wait_secs, 60);
        assert_eq!(cfg.llm.model, "ollama/gemma3:4b");
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[evolution]\npopulation_size = 8\n\n[llm.retry]\nmax_attempts = 2\n"
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.evolution.population_size, 8);
        // 未写出的键保持默认
        assert_eq!(cfg.evolution.generations, 3);
        assert_eq!(cfg.llm.retry.max_attempts, 2);
        assert_eq!(cfg.llm.retry.multiplier, 2.0);
    }
}
