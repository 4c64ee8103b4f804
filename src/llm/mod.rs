//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Ollama / Gemini / Mock）与 Oracle 门面

pub mod message;
pub mod mock;
pub mod openai;
pub mod oracle;
pub mod providers;
pub mod traits;

use std::sync::Arc;
use std::time::Duration;

pub use message::{Message, Role};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use oracle::CodeOracle;
pub use providers::{create_client, parse_model_identifier, Provider};
pub use traits::{LlmClient, LlmError, RetryConfig, RetryingLlmClient};

use crate::config::LlmSection;

/// 根据模型标识与 [llm] 配置创建带重试的客户端；未知 provider 或缺少 API Key 时返回错误
pub fn create_llm(model_identifier: &str, cfg: &LlmSection) -> Result<Arc<dyn LlmClient>, LlmError> {
    let (provider, model) = parse_model_identifier(model_identifier, &cfg.provider)?;
    let inner = create_client(
        provider,
        &model,
        cfg.base_url.as_deref(),
        Duration::from_secs(cfg.request_timeout_secs),
    )?;
    let retry = if provider == Provider::Mock {
        RetryConfig::immediate(cfg.retry.max_attempts)
    } else {
        RetryConfig::from(&cfg.retry)
    };
    Ok(Arc::new(RetryingLlmClient::new(inner, retry)))
}
