//! Oracle：面向进化循环的生成接口
//!
//! generate(prompt, system_prompt) 把可选 system 与 user 拼成消息列表后调用底层 LlmClient；
//! 重试由 RetryingLlmClient 在更底层完成，这里只透传错误。

use std::sync::Arc;

use crate::llm::{LlmClient, LlmError, Message};

#[derive(Clone)]
pub struct CodeOracle {
    llm: Arc<dyn LlmClient>,
}

impl CodeOracle {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(prompt));
        self.llm.complete(&messages).await
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, Role};

    #[tokio::test]
    async fn test_generate_sends_system_then_user() {
        let mock = Arc::new(MockLlmClient::scripted([Ok("def f():\n    pass".to_string())]));
        let oracle = CodeOracle::new(mock.clone());
        let out = oracle.generate("write f", Some("only code")).await.unwrap();
        assert!(out.starts_with("def f"));

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0].role, Role::System);
        assert_eq!(calls[0][0].content, "only code");
        assert_eq!(calls[0][1].role, Role::User);
        assert_eq!(calls[0][1].content, "write f");
    }

    #[tokio::test]
    async fn test_generate_without_system_prompt() {
        let mock = Arc::new(MockLlmClient::new());
        let oracle = CodeOracle::new(mock.clone());
        let out = oracle.generate("echo me", None).await.unwrap();
        assert_eq!(out, "echo me");
        assert_eq!(mock.calls()[0].len(), 1);
    }
}
