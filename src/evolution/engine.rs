//! 进化循环控制器
//!
//! 状态机：种子（仅在种群为空时）→ 评估 → 排名与汇总 → 终止判断 → 繁殖，直到出现满分个体或代数用尽。
//! 繁殖采用精英保留 + 按排名轮转选父代的单亲变异；Oracle 失败只降低下一代规模，不中止运行。

use std::sync::Arc;
use std::time::Duration;

use crate::config::{
    EvolutionSection, DEFAULT_MUTATION_SYSTEM_PROMPT, DEFAULT_SEED_SYSTEM_PROMPT,
};
use crate::core::EvolveError;
use crate::evolution::{
    EvolutionOutcome, GenerationReport, Individual, NoopTelemetry, Population, Telemetry,
    Termination, TimeoutEvaluator,
};
use crate::llm::{CodeOracle, LlmClient};
use crate::task::Task;

#[derive(Debug, Clone)]
pub struct EvolutionConfig {
    pub generations: usize,
    pub population_size: usize,
    pub eval_timeout: Duration,
    pub seed_system_prompt: String,
    pub mutation_system_prompt: String,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            generations: 3,
            population_size: 5,
            eval_timeout: Duration::from_secs(5),
            seed_system_prompt: DEFAULT_SEED_SYSTEM_PROMPT.to_string(),
            mutation_system_prompt: DEFAULT_MUTATION_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl TryFrom<&EvolutionSection> for EvolutionConfig {
    type Error = EvolveError;

    fn try_from(section: &EvolutionSection) -> Result<Self, Self::Error> {
        let secs = section.eval_timeout_secs;
        if !secs.is_finite() || secs <= 0.0 {
            return Err(EvolveError::InvalidConfig(format!(
                "eval_timeout_secs must be a positive number, got {secs}"
            )));
        }
        let config = Self {
            generations: section.generations,
            population_size: section.population_size,
            eval_timeout: Duration::try_from_secs_f64(secs)
                .map_err(|e| EvolveError::InvalidConfig(format!("eval_timeout_secs: {e}")))?,
            seed_system_prompt: section.seed_system_prompt.clone(),
            mutation_system_prompt: section.mutation_system_prompt.clone(),
        };
        config.validate()?;
        Ok(config)
    }
}

impl EvolutionConfig {
    pub fn validate(&self) -> Result<(), EvolveError> {
        if self.generations == 0 {
            return Err(EvolveError::InvalidConfig("generations must be at least 1".into()));
        }
        if self.population_size == 0 {
            return Err(EvolveError::InvalidConfig("population_size must be at least 1".into()));
        }
        if self.eval_timeout.is_zero() {
            return Err(EvolveError::InvalidConfig("eval_timeout must be positive".into()));
        }
        Ok(())
    }

    /// 每代繁殖的 Oracle 调用上限，保证持续失败时循环也会结束
    pub fn max_breeding_attempts(&self) -> usize {
        2 * self.population_size
    }
}

pub struct EvolutionEngine {
    oracle: CodeOracle,
    task: Arc<dyn Task>,
    evaluator: TimeoutEvaluator,
    telemetry: Arc<dyn Telemetry>,
    config: EvolutionConfig,
    population: Population,
}

impl EvolutionEngine {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        task: Arc<dyn Task>,
        config: EvolutionConfig,
    ) -> Result<Self, EvolveError> {
        config.validate()?;
        Ok(Self {
            oracle: CodeOracle::new(llm),
            task,
            evaluator: TimeoutEvaluator::new(config.eval_timeout),
            telemetry: Arc::new(NoopTelemetry),
            config,
            population: Population::new(),
        })
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// 预置种群；非空时 run() 跳过种子阶段。超出 population_size 的部分被丢弃
    pub fn with_population(mut self, mut individuals: Vec<Individual>) -> Self {
        if individuals.len() > self.config.population_size {
            tracing::warn!(
                given = individuals.len(),
                target = self.config.population_size,
                "Initial population truncated"
            );
            individuals.truncate(self.config.population_size);
        }
        self.population = Population::from(individuals);
        self
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// 用 initial_prompt 生成 population_size 个种子；失败的生成只记录日志并跳过
    pub async fn seed_population(&mut self) {
        tracing::info!(task = self.task.name(), "Seeding population");
        let prompt = self.task.initial_prompt();
        for i in 0..self.config.population_size {
            match self
                .oracle
                .generate(&prompt, Some(&self.config.seed_system_prompt))
                .await
            {
                Ok(code) => self.population.push(Individual::new(code)),
                Err(e) => tracing::warn!(index = i, error = %e, "Error generating individual"),
            }
        }
        tracing::info!(
            seeded = self.population.len(),
            target = self.config.population_size,
            "Seeding finished"
        );
    }

    /// 顺序评估当前种群；任何失败（含超时）都记为 0.0 并写入 feedback
    async fn evaluate_population(&mut self) {
        for (i, individual) in self.population.iter_mut().enumerate() {
            match self.evaluator.evaluate(self.task.clone(), &individual.code).await {
                Ok(fitness) => {
                    individual.fitness = fitness;
                    individual.feedback.clear();
                    tracing::debug!(index = i, fitness, "evaluated");
                }
                Err(e) => {
                    individual.fitness = 0.0;
                    individual.feedback = e.to_string();
                    tracing::debug!(index = i, error = %e, "evaluation failed");
                }
            }
        }
    }

    /// 从已排名的当前种群繁殖下一代：精英原样保留，其余由轮转选出的父代变异而来
    async fn breed(&self) -> Population {
        let current = self.population.individuals();
        let Some(elite) = current.first() else {
            return Population::new();
        };

        let target = self.config.population_size;
        let max_attempts = self.config.max_breeding_attempts();
        let mut next = Vec::with_capacity(target);
        next.push(elite.clone());

        let mut attempts = 0;
        let mut failures = 0;
        while next.len() < target && attempts < max_attempts {
            attempts += 1;
            // 失败后换下一个父代重试
            let parent_index = (next.len() + failures) % current.len();
            let parent = &current[parent_index];
            let prompt = self
                .task
                .mutation_prompt(&parent.code, &parent.feedback, parent.fitness);

            match self
                .oracle
                .generate(&prompt, Some(&self.config.mutation_system_prompt))
                .await
            {
                Ok(code) => next.push(Individual::new(code)),
                Err(e) => {
                    failures += 1;
                    tracing::warn!(parent = parent_index, attempt = attempts, error = %e, "Error mutating");
                }
            }
        }

        if next.len() < target {
            tracing::warn!(
                size = next.len(),
                target,
                "Breeding attempts exhausted; next generation is smaller"
            );
        }
        Population::from(next)
    }

    /// 运行进化循环，返回最优个体；种子阶段一个个体都没有时返回 NoIndividuals
    pub async fn run(&mut self) -> Result<EvolutionOutcome, EvolveError> {
        if self.population.is_empty() {
            self.seed_population().await;
        }
        if self.population.is_empty() {
            return Err(EvolveError::NoIndividuals);
        }

        let total = self.config.generations;
        let mut generation = 0;
        loop {
            generation += 1;
            tracing::info!(generation, total, size = self.population.len(), "Generation");

            self.evaluate_population().await;
            self.population.rank();
            let report = GenerationReport::from_ranked(generation, &self.population);
            self.telemetry.record_generation(&report);

            let best = self
                .population
                .best()
                .cloned()
                .ok_or(EvolveError::NoIndividuals)?;
            tracing::info!(generation, best_fitness = best.fitness, "Best fitness");

            let termination = if best.fitness == 1.0 {
                tracing::info!(generation, "Perfect solution found");
                Some(Termination::PerfectFound)
            } else if generation >= total {
                Some(Termination::BudgetExhausted)
            } else {
                None
            };

            if let Some(termination) = termination {
                return Ok(EvolutionOutcome {
                    best,
                    termination,
                    generations_run: generation,
                });
            }

            self.population = self.breed().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::llm::{LlmError, MockLlmClient};
    use crate::task::{EvalContext, TaskError};

    /// 按代码文本查表打分，并记录评估顺序
    struct TableTask {
        scores: HashMap<String, Result<f64, String>>,
        evaluated: Mutex<Vec<String>>,
    }

    impl TableTask {
        fn new(scores: &[(&str, Result<f64, &str>)]) -> Arc<Self> {
            Arc::new(Self {
                scores: scores
                    .iter()
                    .map(|(code, r)| (code.to_string(), r.map_err(str::to_string)))
                    .collect(),
                evaluated: Mutex::new(Vec::new()),
            })
        }

        fn evaluated(&self) -> Vec<String> {
            self.evaluated.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Task for TableTask {
        fn name(&self) -> &str {
            "table"
        }

        fn description(&self) -> &str {
            "look the score up in a table"
        }

        async fn evaluate(&self, code: &str, _ctx: &EvalContext) -> Result<f64, TaskError> {
            self.evaluated.lock().unwrap().push(code.to_string());
            match self.scores.get(code) {
                Some(Ok(f)) => Ok(*f),
                Some(Err(msg)) => Err(TaskError::Execution(msg.clone())),
                None => Ok(0.0),
            }
        }
    }

    #[derive(Default)]
    struct GenerationLog(Mutex<Vec<GenerationReport>>);

    impl Telemetry for GenerationLog {
        fn record_generation(&self, report: &GenerationReport) {
            self.0.lock().unwrap().push(report.clone());
        }
    }

    fn ok(code: &str) -> Result<String, LlmError> {
        Ok(code.to_string())
    }

    fn fail() -> Result<String, LlmError> {
        Err(LlmError::ApiError("provider unavailable".to_string()))
    }

    fn config(generations: usize, population_size: usize) -> EvolutionConfig {
        EvolutionConfig {
            generations,
            population_size,
            eval_timeout: Duration::from_secs(5),
            ..EvolutionConfig::default()
        }
    }

    #[tokio::test]
    async fn test_elite_survives_and_parents_rotate_by_rank() {
        let task = TableTask::new(&[
            ("cand_a", Ok(0.2)),
            ("cand_b", Ok(0.5)),
            ("cand_c", Ok(0.9)),
            ("child_1", Ok(0.1)),
            ("child_2", Ok(0.1)),
        ]);
        let llm = Arc::new(MockLlmClient::scripted([
            ok("cand_a"),
            ok("cand_b"),
            ok("cand_c"),
            ok("child_1"),
            ok("child_2"),
        ]));

        let mut engine = EvolutionEngine::new(llm.clone(), task.clone(), config(2, 3)).unwrap();
        let outcome = engine.run().await.unwrap();

        // 第二代以上一代的最优个体开头，代码不变
        let evaluated = task.evaluated();
        assert_eq!(evaluated[..3], ["cand_a", "cand_b", "cand_c"]);
        assert_eq!(evaluated[3..], ["cand_c", "child_1", "child_2"]);

        // 排名为 [c, b, a]：父代下标依次为 1、2
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 5);
        assert!(prompts[3].contains("cand_b") && prompts[3].contains("0.5000"));
        assert!(prompts[4].contains("cand_a") && prompts[4].contains("0.2000"));

        assert_eq!(outcome.termination, Termination::BudgetExhausted);
        assert_eq!(outcome.generations_run, 2);
        assert_eq!(outcome.best.code, "cand_c");
        assert_eq!(outcome.best.fitness, 0.9);
    }

    #[tokio::test]
    async fn test_perfect_score_stops_early() {
        let task = TableTask::new(&[("x0", Ok(0.3)), ("x1", Ok(0.4)), ("perfect", Ok(1.0))]);
        let llm = Arc::new(MockLlmClient::scripted([ok("x0"), ok("x1"), ok("perfect")]));
        let log = Arc::new(GenerationLog::default());

        let mut engine = EvolutionEngine::new(llm.clone(), task, config(10, 2))
            .unwrap()
            .with_telemetry(log.clone());
        let outcome = engine.run().await.unwrap();

        assert_eq!(outcome.termination, Termination::PerfectFound);
        assert_eq!(outcome.generations_run, 2);
        assert_eq!(outcome.best.code, "perfect");
        assert_eq!(outcome.best.fitness, 1.0);
        assert_eq!(log.0.lock().unwrap().len(), 2);
        assert_eq!(llm.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_near_perfect_does_not_stop() {
        let task = TableTask::new(&[("close", Ok(0.999))]);
        let llm = Arc::new(MockLlmClient::scripted([ok("close"), ok("close")]));
        let mut engine = EvolutionEngine::new(llm, task, config(3, 1)).unwrap();
        let outcome = engine.run().await.unwrap();
        assert_eq!(outcome.termination, Termination::BudgetExhausted);
        assert_eq!(outcome.generations_run, 3);
    }

    #[tokio::test]
    async fn test_total_seeding_failure_yields_no_individuals() {
        let task = TableTask::new(&[]);
        let llm = Arc::new(MockLlmClient::scripted([fail(), fail(), fail()]));
        let mut engine = EvolutionEngine::new(llm, task.clone(), config(3, 3)).unwrap();
        assert!(matches!(engine.run().await, Err(EvolveError::NoIndividuals)));
        assert!(task.evaluated().is_empty());
    }

    #[tokio::test]
    async fn test_partial_seeding_still_runs() {
        let task = TableTask::new(&[("only", Ok(0.6))]);
        let llm = Arc::new(MockLlmClient::scripted([fail(), ok("only"), fail()]));
        let mut engine = EvolutionEngine::new(llm, task.clone(), config(1, 3)).unwrap();
        let outcome = engine.run().await.unwrap();
        assert_eq!(outcome.best.code, "only");
        assert_eq!(task.evaluated(), vec!["only"]);
    }

    #[tokio::test]
    async fn test_persistent_breeding_failure_keeps_only_elite() {
        let task = TableTask::new(&[("s0", Ok(0.1)), ("s1", Ok(0.7)), ("s2", Ok(0.3))]);
        let mut script = vec![ok("s0"), ok("s1"), ok("s2")];
        script.extend((0..6).map(|_| fail()));
        let llm = Arc::new(MockLlmClient::scripted(script));

        let mut engine = EvolutionEngine::new(llm.clone(), task.clone(), config(2, 3)).unwrap();
        let outcome = engine.run().await.unwrap();

        // 繁殖尝试上限 2 × population_size
        assert_eq!(llm.calls().len(), 3 + 6);
        assert_eq!(task.evaluated()[3..], ["s1"]);
        assert_eq!(engine.population().len(), 1);
        assert_eq!(outcome.best.code, "s1");
    }

    #[tokio::test]
    async fn test_failed_mutation_moves_to_next_parent() {
        let task = TableTask::new(&[("p0", Ok(0.9)), ("p1", Ok(0.5)), ("p2", Ok(0.1))]);
        let llm = Arc::new(MockLlmClient::scripted([
            ok("p0"),
            ok("p1"),
            ok("p2"),
            fail(),
            ok("n1"),
            ok("n2"),
        ]));

        let mut engine = EvolutionEngine::new(llm.clone(), task.clone(), config(2, 3)).unwrap();
        engine.run().await.unwrap();

        let prompts = llm.prompts();
        assert!(prompts[3].contains("p1"));
        // 下标 (1 + 1) % 3 = 2
        assert!(prompts[4].contains("p2"));
        // 下标 (2 + 1) % 3 = 0
        assert!(prompts[5].contains("p0"));
        assert_eq!(task.evaluated()[3..], ["p0", "n1", "n2"]);
    }

    #[tokio::test]
    async fn test_evaluation_error_becomes_feedback() {
        let task = TableTask::new(&[("good", Ok(0.5)), ("bad", Err("SyntaxError: invalid syntax"))]);
        let llm = Arc::new(MockLlmClient::scripted([ok("good"), ok("bad"), ok("fixed")]));

        let mut engine = EvolutionEngine::new(llm.clone(), task, config(2, 2)).unwrap();
        engine.run().await.unwrap();

        // 排名 [good, bad]，下标 1 的父代是 bad
        let prompt = &llm.prompts()[2];
        assert!(prompt.contains("SyntaxError: invalid syntax"));
        assert!(prompt.contains("Current fitness: 0.0000"));
    }

    #[tokio::test]
    async fn test_existing_population_skips_seeding() {
        let task = TableTask::new(&[("given", Ok(0.4))]);
        let llm = Arc::new(MockLlmClient::new());
        let mut engine = EvolutionEngine::new(llm.clone(), task, config(1, 4))
            .unwrap()
            .with_population(vec![Individual::new("given")]);
        let outcome = engine.run().await.unwrap();
        assert!(llm.calls().is_empty());
        assert_eq!(outcome.best.fitness, 0.4);
    }

    #[tokio::test]
    async fn test_oversized_initial_population_is_truncated() {
        let task = TableTask::new(&[("i0", Ok(0.1)), ("i1", Ok(0.2)), ("i2", Ok(0.3))]);
        let llm = Arc::new(MockLlmClient::new());
        let seeds = ["i0", "i1", "i2", "i3", "i4"].map(Individual::new).to_vec();
        let mut engine = EvolutionEngine::new(llm, task.clone(), config(1, 3))
            .unwrap()
            .with_population(seeds);
        assert_eq!(engine.population().len(), 3);

        engine.run().await.unwrap();
        assert_eq!(task.evaluated(), vec!["i0", "i1", "i2"]);
    }

    #[tokio::test]
    async fn test_negative_zero_ties_keep_order() {
        let task = TableTask::new(&[("neg", Ok(-0.0)), ("pos", Ok(0.0))]);
        let llm = Arc::new(MockLlmClient::new());
        let mut engine = EvolutionEngine::new(llm, task, config(1, 2))
            .unwrap()
            .with_population(vec![Individual::new("neg"), Individual::new("pos")]);
        let outcome = engine.run().await.unwrap();

        let order: Vec<&str> = engine
            .population()
            .individuals()
            .iter()
            .map(|i| i.code.as_str())
            .collect();
        assert_eq!(order, vec!["neg", "pos"]);
        assert!(outcome.best.fitness.is_sign_positive());
    }

    #[tokio::test]
    async fn test_population_never_exceeds_target() {
        let task = TableTask::new(&[]);
        let llm = Arc::new(MockLlmClient::new());
        let log = Arc::new(GenerationLog::default());
        let mut engine = EvolutionEngine::new(llm, task, config(4, 3))
            .unwrap()
            .with_telemetry(log.clone());
        engine.run().await.unwrap();
        for report in log.0.lock().unwrap().iter() {
            assert!((1..=3).contains(&report.entries.len()));
            assert!(report
                .entries
                .iter()
                .all(|e| (0.0..=1.0).contains(&e.fitness)));
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(config(0, 3).validate().is_err());
        assert!(config(3, 0).validate().is_err());

        let section = EvolutionSection {
            eval_timeout_secs: -1.0,
            ..EvolutionSection::default()
        };
        assert!(EvolutionConfig::try_from(&section).is_err());

        let parsed = EvolutionConfig::try_from(&EvolutionSection::default()).unwrap();
        assert_eq!(parsed.eval_timeout, Duration::from_secs(5));
        assert_eq!(parsed.max_breeding_attempts(), 10);
    }
}
