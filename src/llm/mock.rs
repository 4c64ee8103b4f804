//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! 优先按顺序返回预置的脚本化回复；脚本耗尽后回显最后一条 User 消息。
//! 所有收到的消息都会被记录，便于断言 Prompt 内容。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, Message, Role};

#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按顺序返回给定回复（Ok 为代码文本，Err 模拟 Oracle 失败）
    pub fn scripted(responses: impl IntoIterator<Item = Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 每次调用收到的完整消息列表
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// 每次调用中的 User 消息内容
    pub fn prompts(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|messages| last_user(messages).map(str::to_string))
            .collect()
    }
}

fn last_user(messages: &[Message]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| matches!(m.role, Role::User))
        .map(|m| m.content.as_str())
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }

        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match scripted {
            Some(response) => response,
            None => Ok(last_user(messages).unwrap_or("(no input)").to_string()),
        }
    }
}
