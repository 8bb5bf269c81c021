//! 프롬프트 보강 단계: 사용자의 원래 요청을 모델에게 보내 더 구체적인 지시로 다듬습니다.

use crate::error::AppError;
use crate::services::completion::CompletionClient;

/// 보강 지시문은 새 프로젝트 생성인지, 기존 사이트 수정인지에 따라 달라집니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    Creation,
    Revision,
}

const CREATION_INSTRUCTION: &str = "\
You are a prompt enhancement specialist. Take the user's request and expand it into a detailed, \
comprehensive prompt that will help an AI system generate a complete website.

Enhance this prompt by:
1. Adding specific design details (layout, color scheme, typography).
2. Including functional requirements (navigation, interactivity, responsiveness).
3. Specifying content elements (text, images, multimedia).
4. Considering user experience (ease of use, accessibility).
5. Making sure the prompt is clear and unambiguous.
6. Including modern web design trends and best practices.

Return ONLY the enhanced prompt, nothing else. Make it detailed but concise (2-3 paragraphs max).";

const REVISION_INSTRUCTION: &str = "\
You are a prompt enhancement specialist. The user wants to make changes to their website. \
Enhance their request to be more specific and actionable for a web developer.

Enhance this by:
1. Being specific about what elements to change
2. Mentioning design details (colors, spacing, sizes)
3. Clarifying the desired outcome
4. Using clear technical terms

Return ONLY the enhanced request, nothing else. Keep it concise (1-2 sentences).";

impl PromptMode {
    pub fn system_instruction(self) -> &'static str {
        match self {
            PromptMode::Creation => CREATION_INSTRUCTION,
            PromptMode::Revision => REVISION_INSTRUCTION,
        }
    }

    fn user_message(self, raw_prompt: &str) -> String {
        match self {
            PromptMode::Creation => raw_prompt.to_string(),
            PromptMode::Revision => format!("User's request: \"{}\"", raw_prompt),
        }
    }
}

/// completion 호출 실패는 그대로 전파하고, 빈 답변은 `GenerationFailure`로 바꿉니다.
pub async fn enhance_prompt(
    client: &dyn CompletionClient,
    raw_prompt: &str,
    mode: PromptMode,
) -> Result<String, AppError> {
    let reply = client
        .complete(mode.system_instruction(), &mode.user_message(raw_prompt))
        .await?;

    let enhanced = reply.trim();
    if enhanced.is_empty() {
        return Err(AppError::GenerationFailure(
            "prompt enhancement returned no content".to_string(),
        ));
    }
    Ok(enhanced.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::completion::testing::ScriptedCompletion;

    #[tokio::test]
    async fn revision_request_is_quoted() {
        let client = ScriptedCompletion::new(["  Make the header navy blue.  "]);

        let enhanced = enhance_prompt(&client, "blue header", PromptMode::Revision)
            .await
            .unwrap();

        assert_eq!(enhanced, "Make the header navy blue.");
        let calls = client.calls.lock().unwrap();
        assert_eq!(calls[0].0, REVISION_INSTRUCTION);
        assert_eq!(calls[0].1, "User's request: \"blue header\"");
    }

    #[tokio::test]
    async fn creation_sends_prompt_verbatim() {
        let client = ScriptedCompletion::new(["A warm bakery site."]);

        enhance_prompt(&client, "a bakery", PromptMode::Creation).await.unwrap();

        let calls = client.calls.lock().unwrap();
        assert_eq!(calls[0], (CREATION_INSTRUCTION.to_string(), "a bakery".to_string()));
    }

    #[tokio::test]
    async fn blank_reply_is_generation_failure() {
        let client = ScriptedCompletion::new(["   \n"]);

        let err = enhance_prompt(&client, "a bakery", PromptMode::Creation)
            .await
            .unwrap_err();
        assert!(err.is_generation_failure());
    }

    #[tokio::test]
    async fn client_error_propagates() {
        let client = ScriptedCompletion::default().then_fail("upstream down");

        let err = enhance_prompt(&client, "a bakery", PromptMode::Creation)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Completion(_)));
    }
}
