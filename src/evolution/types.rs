use std::fmt;

use serde::{Deserialize, Serialize};

/// 候选解：代码文本 + 适应度 + 诊断反馈
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub code: String,
    /// 0.0 ~ 1.0，未评估时为 0.0
    pub fitness: f64,
    /// 错误信息 / 超时提示，仅作为变异 Prompt 的上下文
    pub feedback: String,
}

impl Individual {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            fitness: 0.0,
            feedback: String::new(),
        }
    }

    pub fn status(&self) -> EvalStatus {
        EvalStatus::from_fitness(self.fitness)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvalStatus {
    Pass,
    Partial,
    Fail,
}

impl EvalStatus {
    pub fn from_fitness(fitness: f64) -> Self {
        if fitness >= 1.0 {
            EvalStatus::Pass
        } else if fitness > 0.0 {
            EvalStatus::Partial
        } else {
            EvalStatus::Fail
        }
    }
}

impl fmt::Display for EvalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalStatus::Pass => write!(f, "PASS"),
            EvalStatus::Partial => write!(f, "PARTIAL"),
            EvalStatus::Fail => write!(f, "FAIL"),
        }
    }
}

/// 种群：排序前为插入顺序，rank() 后按适应度降序（稳定排序，同分保持原相对顺序）
#[derive(Debug, Clone, Default)]
pub struct Population {
    individuals: Vec<Individual>,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, individual: Individual) {
        self.individuals.push(individual);
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn rank(&mut self) {
        self.individuals
            .sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
    }

    /// 排序后的首个个体
    pub fn best(&self) -> Option<&Individual> {
        self.individuals.first()
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Individual> {
        self.individuals.iter_mut()
    }
}

impl From<Vec<Individual>> for Population {
    fn from(individuals: Vec<Individual>) -> Self {
        Self { individuals }
    }
}

/// 排名表中的一行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    /// 从 1 开始
    pub rank: usize,
    pub fitness: f64,
    pub code_len: usize,
    pub status: EvalStatus,
}

/// 单代汇总，交给 Telemetry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
    /// 从 1 开始
    pub generation: usize,
    pub best_fitness: f64,
    pub average_fitness: f64,
    pub average_code_length: f64,
    pub entries: Vec<RankedEntry>,
}

impl GenerationReport {
    /// population 需已 rank()
    pub fn from_ranked(generation: usize, population: &Population) -> Self {
        let individuals = population.individuals();
        let n = individuals.len().max(1) as f64;
        let entries: Vec<RankedEntry> = individuals
            .iter()
            .enumerate()
            .map(|(i, ind)| RankedEntry {
                rank: i + 1,
                fitness: ind.fitness,
                code_len: ind.code.chars().count(),
                status: ind.status(),
            })
            .collect();

        Self {
            generation,
            best_fitness: individuals.first().map(|i| i.fitness).unwrap_or(0.0),
            average_fitness: individuals.iter().map(|i| i.fitness).sum::<f64>() / n,
            average_code_length: entries.iter().map(|e| e.code_len as f64).sum::<f64>() / n,
            entries,
        }
    }
}

/// 终止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Termination {
    /// 出现适应度恰好为 1.0 的个体
    PerfectFound,
    /// 代数预算用尽
    BudgetExhausted,
}

#[derive(Debug, Clone)]
pub struct EvolutionOutcome {
    pub best: Individual,
    pub termination: Termination,
    pub generations_run: usize,
}
