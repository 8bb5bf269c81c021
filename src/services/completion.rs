//! # 언어 모델 completion 클라이언트
//!
//! 파이프라인은 `CompletionClient` 트레이트에만 의존합니다.
//! 운영 환경에서는 OpenAI 호환 `/chat/completions` 엔드포인트를 호출하는
//! `OpenAiCompletionClient`를, 테스트에서는 가짜 구현을 주입합니다.
//!
//! 한 번의 호출에는 항상 system 메시지 하나와 user 메시지 하나만 보냅니다.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("completion response had no choices")]
    NoChoices,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// system 지시문과 user 메시지를 보내고 모델의 답변 텍스트를 돌려받습니다.
    /// 모델이 content 없이 응답하면 빈 문자열을 반환합니다.
    async fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct OpenAiCompletionClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompletionClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(CompletionError::NoChoices)?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

#[cfg(test)]
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// 미리 정해 둔 응답을 순서대로 돌려주는 가짜 클라이언트.
    /// 받은 (system, user) 메시지를 기록해 두어 테스트에서 확인할 수 있습니다.
    #[derive(Default)]
    pub struct ScriptedCompletion {
        replies: Mutex<VecDeque<Result<String, String>>>,
        pub calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedCompletion {
        pub fn new<I, S>(replies: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// 다음 호출에서 HTTP 에러를 흉내 냅니다.
        pub fn then_fail(self, body: &str) -> Self {
            self.replies.lock().unwrap().push_back(Err(body.to_string()));
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedCompletion {
        async fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError> {
            self.calls
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(body)) => Err(CompletionError::Status { status: 500, body }),
                None => Ok(String::new()),
            }
        }
    }
}
