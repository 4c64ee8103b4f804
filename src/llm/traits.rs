//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Ollama / Mock）实现 LlmClient::complete；
//! RetryingLlmClient 在任意后端外层套指数退避重试，重试耗尽后把最后一次错误交给调用方。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::RetrySection;
use crate::llm::Message;

/// Oracle 调用失败的原因
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model returned an empty completion")]
    EmptyResponse,

    #[error("LLM configuration error: {0}")]
    Config(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<LlmError> },
}

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成，返回首条回复内容
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

/// 重试策略：最多 max_attempts 次，第 n 次失败后等待 clamp(multiplier * 2^(n-1), min_wait, max_wait)
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub multiplier: f64,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            multiplier: 2.0,
            min_wait: Duration::from_secs(10),
            max_wait: Duration::from_secs(60),
        }
    }
}

impl From<&RetrySection> for RetryConfig {
    fn from(section: &RetrySection) -> Self {
        Self {
            max_attempts: section.max_attempts,
            multiplier: section.multiplier,
            min_wait: Duration::from_secs(section.min_wait_secs),
            max_wait: Duration::from_secs(section.max_wait_secs),
        }
    }
}

impl RetryConfig {
    /// 不等待的重试策略（测试与本地 Mock 用）
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            multiplier: 0.0,
            min_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
        }
    }

    /// 第 attempt 次（从 1 开始）失败后、下一次尝试前的等待时长
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let max = self.max_wait.max(self.min_wait);
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let raw = self.multiplier * 2f64.powi(exponent);
        // 超出 Duration 表示范围时按上限处理
        let wait = if raw.is_nan() || raw <= 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(raw).unwrap_or(Duration::MAX)
        };
        wait.clamp(self.min_wait, max)
    }
}

/// 带重试的客户端包装：对内部客户端的每次失败按 RetryConfig 退避后重试
pub struct RetryingLlmClient {
    inner: Arc<dyn LlmClient>,
    config: RetryConfig,
}

impl RetryingLlmClient {
    pub fn new(inner: Arc<dyn LlmClient>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

#[async_trait]
impl LlmClient for RetryingLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.inner.complete(messages).await {
                Ok(content) => {
                    if attempt > 1 {
                        tracing::debug!(attempt, "llm: completion succeeded after retries");
                    }
                    return Ok(content);
                }
                Err(e) if attempt >= max_attempts => {
                    tracing::warn!(attempts = attempt, error = %e, "llm: all attempts exhausted");
                    return Err(LlmError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.config.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        max = max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "llm: completion failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.inner.token_usage()
    }
}
