//! 每代汇总的观察者
//!
//! 纯消费方：只读取 GenerationReport，不影响进化结果。默认 NoopTelemetry。

use std::sync::Arc;

use crate::evolution::GenerationReport;

pub trait Telemetry: Send + Sync {
    fn record_generation(&self, report: &GenerationReport);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn record_generation(&self, _report: &GenerationReport) {}
}

/// 以结构化日志输出汇总标量
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn record_generation(&self, report: &GenerationReport) {
        tracing::info!(
            generation = report.generation,
            best_fitness = report.best_fitness,
            average_fitness = report.average_fitness,
            average_code_length = report.average_code_length,
            population = report.entries.len(),
            "generation summary"
        );
    }
}

/// 终端排名表（CLI 使用）
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleTelemetry;

impl ConsoleTelemetry {
    pub fn render(report: &GenerationReport) -> String {
        let mut out = format!(
            "Generation {}: best {:.4} | avg {:.4} | avg length {:.0}\n",
            report.generation, report.best_fitness, report.average_fitness, report.average_code_length
        );
        out.push_str(&format!("{:>5}  {:>8}  {:>7}  {}\n", "Rank", "Fitness", "Length", "Status"));
        for entry in &report.entries {
            out.push_str(&format!(
                "{:>5}  {:>8.4}  {:>7}  {}\n",
                entry.rank, entry.fitness, entry.code_len, entry.status
            ));
        }
        out
    }
}

impl Telemetry for ConsoleTelemetry {
    fn record_generation(&self, report: &GenerationReport) {
        println!("\n{}", Self::render(report));
    }
}

/// 同时转发给多个观察者
#[derive(Default, Clone)]
pub struct FanoutTelemetry {
    sinks: Vec<Arc<dyn Telemetry>>,
}

impl FanoutTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn Telemetry>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Telemetry for FanoutTelemetry {
    fn record_generation(&self, report: &GenerationReport) {
        for sink in &self.sinks {
            sink.record_generation(report);
        }
    }
}
