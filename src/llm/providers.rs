//! 模型标识解析与后端预设
//!
//! 模型标识采用 `provider/model` 形式（如 `ollama/gemma3:4b`、`deepseek/deepseek-chat`）；
//! 无前缀时使用配置中的默认 provider。所有远程后端都走 OpenAI 兼容协议。

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::llm::{LlmClient, LlmError, MockLlmClient, OpenAiClient};

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";

/// 支持的后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Ollama,
    OpenAi,
    DeepSeek,
    Gemini,
    Mock,
}

impl FromStr for Provider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Provider::Ollama),
            "openai" => Ok(Provider::OpenAi),
            "deepseek" => Ok(Provider::DeepSeek),
            "gemini" => Ok(Provider::Gemini),
            "mock" => Ok(Provider::Mock),
            other => Err(LlmError::Config(format!("unknown LLM provider '{other}'"))),
        }
    }
}

/// 拆分 `provider/model`；只在第一个 `/` 处切分（Ollama 模型名可含 `:`）
pub fn parse_model_identifier(
    identifier: &str,
    default_provider: &str,
) -> Result<(Provider, String), LlmError> {
    let identifier = identifier.trim();
    let (provider, model) = match identifier.split_once('/') {
        Some((p, m)) => (p.parse::<Provider>()?, m.trim()),
        None => (default_provider.parse::<Provider>()?, identifier),
    };
    if model.is_empty() && provider != Provider::Mock {
        return Err(LlmError::Config(format!(
            "model identifier '{identifier}' has no model name"
        )));
    }
    Ok((provider, model.to_string()))
}

/// 按 provider 创建客户端；env 用于读取 API Key（便于测试注入）
pub fn create_client_with_env(
    provider: Provider,
    model: &str,
    base_url: Option<&str>,
    request_timeout: Duration,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Arc<dyn LlmClient>, LlmError> {
    let require = |names: &[&str]| -> Result<String, LlmError> {
        names
            .iter()
            .find_map(|name| env(name).filter(|v| !v.trim().is_empty()))
            .ok_or_else(|| LlmError::Config(format!("{} is not set", names.join(" or "))))
    };

    let client = match provider {
        Provider::Mock => return Ok(Arc::new(MockLlmClient::new())),
        Provider::Ollama => OpenAiClient::new(Some(base_url.unwrap_or(OLLAMA_BASE_URL)), model, "ollama"),
        Provider::OpenAi => {
            let key = require(&["OPENAI_API_KEY"])?;
            OpenAiClient::new(base_url, model, &key)
        }
        Provider::DeepSeek => {
            let key = require(&["DEEPSEEK_API_KEY", "OPENAI_API_KEY"])?;
            OpenAiClient::new(Some(base_url.unwrap_or(DEEPSEEK_BASE_URL)), model, &key)
        }
        Provider::Gemini => {
            let key = require(&["GEMINI_API_KEY"])?;
            OpenAiClient::new(Some(base_url.unwrap_or(GEMINI_BASE_URL)), model, &key)
        }
    };
    tracing::info!(?provider, model, "Using OpenAI-compatible LLM");
    Ok(Arc::new(client.with_request_timeout(request_timeout)))
}

pub fn create_client(
    provider: Provider,
    model: &str,
    base_url: Option<&str>,
    request_timeout: Duration,
) -> Result<Arc<dyn LlmClient>, LlmError> {
    create_client_with_env(provider, model, base_url, request_timeout, |name| {
        std::env::var(name).ok()
    })
}
