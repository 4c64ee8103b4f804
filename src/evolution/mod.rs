//! 进化层：个体与种群、带超时的评估器、每代观察者、进化循环

pub mod engine;
pub mod evaluator;
pub mod telemetry;
pub mod types;

pub use engine::{EvolutionConfig, EvolutionEngine};
pub use evaluator::{EvaluationError, TimeoutEvaluator};
pub use telemetry::{ConsoleTelemetry, FanoutTelemetry, NoopTelemetry, TracingTelemetry, Telemetry};
pub use types::{
    EvalStatus, EvolutionOutcome, GenerationReport, Individual, Population, RankedEntry,
    Termination,
};
