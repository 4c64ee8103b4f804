//! Codevolve - LLM 驱动的程序进化搜索
//!
//! 入口：初始化日志、加载配置、解析命令并运行进化或列出任务。

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use codevolve::core::{
    build_registry, list_tasks, load_run_config, run_evolution, EvolveError, RunRequest,
};
use codevolve::evolution::{ConsoleTelemetry, FanoutTelemetry, TracingTelemetry};
use codevolve::observability;

/// Evolve programs for a task with an LLM as the mutation operator
#[derive(Parser)]
#[command(name = "codevolve")]
#[command(about = "LLM-driven evolutionary program search", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path (layered over config/default.toml)
    #[arg(short, long, global = true, env = "CODEVOLVE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evolve a solution for a registered task
    Run {
        /// Task name (see `list-tasks`)
        task: String,

        /// Number of generations
        #[arg(short, long)]
        generations: Option<usize>,

        /// Population size
        #[arg(short, long)]
        population: Option<usize>,

        /// Model identifier, e.g. ollama/gemma3:4b or deepseek/deepseek-chat
        #[arg(short, long)]
        model: Option<String>,

        /// Results root directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List registered tasks
    ListTasks,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    observability::init();

    let cfg = match load_run_config(cli.config.clone()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };
    let registry = build_registry(&cfg);

    match cli.command {
        Commands::ListTasks => {
            for name in list_tasks(&registry) {
                println!("{name}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run {
            task,
            generations,
            population,
            model,
            output,
        } => {
            let request = RunRequest {
                task_name: task,
                generations,
                population_size: population,
                model,
                output_dir: output,
            };
            let telemetry = FanoutTelemetry::new()
                .with(Arc::new(ConsoleTelemetry))
                .with(Arc::new(TracingTelemetry));

            match run_evolution(&cfg, &registry, request, Arc::new(telemetry)).await {
                Ok(report) => {
                    let best = &report.outcome.best;
                    println!("\nBest solution for {}:", report.task_name);
                    println!("{}", best.code);
                    println!("Fitness: {:.4}", best.fitness);
                    if !best.feedback.is_empty() {
                        println!("Feedback: {}", best.feedback);
                    }
                    println!("Saved to {}", report.result_dir.display());
                    Ok(ExitCode::SUCCESS)
                }
                Err(EvolveError::NoIndividuals) => {
                    eprintln!("Evolution produced no individuals: every seed generation failed");
                    Ok(ExitCode::from(2))
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}
