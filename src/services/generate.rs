//! 코드 생성 단계: 보강된 프롬프트로 완전한 HTML 문서를 생성합니다.
//!
//! 후처리는 코드 펜스(```) 제거와 앞뒤 공백 정리뿐이며, HTML 검증은 하지 않습니다.

use crate::error::AppError;
use crate::services::completion::CompletionClient;

const TAILWIND_SCRIPT: &str =
    r#"<script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>"#;

fn creation_instruction(enhanced_prompt: &str) -> String {
    format!(
        r#"You are an expert web developer. Create a complete, production-ready, single-page website based on this request: "{enhanced_prompt}"

CRITICAL REQUIREMENTS:
- You MUST output valid HTML ONLY.
- Use Tailwind CSS for ALL styling
- Include this EXACT script in the <head>: {TAILWIND_SCRIPT}
- Use Tailwind utility classes extensively for styling, animations, and responsiveness
- Make it fully functional and interactive with JavaScript in <script> tag before closing </body>
- Use modern, beautiful design with great UX using Tailwind classes
- Make it responsive using Tailwind responsive classes (sm:, md:, lg:, xl:)
- Use Tailwind animations and transitions (animate-*, transition-*)
- Include all necessary meta tags
- Use Google Fonts CDN if needed for custom fonts
- Use placeholder images from https://placehold.co/600x400
- Use Tailwind gradient classes for beautiful backgrounds
- Make sure all buttons, cards, and components use Tailwind styling

CRITICAL HARD RULES:
1. You MUST put ALL output ONLY into message.content.
2. You MUST NOT include internal thoughts, explanations, analysis, comments, or markdown.
3. Do NOT include markdown, explanations, notes, or code fences.

The HTML should be complete and ready to render as-is with Tailwind CSS."#
    )
}

const REVISION_INSTRUCTION: &str = "\
You are an expert web developer.

CRITICAL REQUIREMENTS:
- Return ONLY the complete updated HTML code with the requested changes.
- Use Tailwind CSS for ALL styling (NO custom CSS).
- Use Tailwind utility classes for all styling changes.
- Include all JavaScript in <script> tags before closing </body>
- Make sure it's a complete, standalone HTML document with Tailwind CSS
- Return the HTML Code Only, nothing else

Apply the requested changes while maintaining the Tailwind CSS styling approach.";

/// `current_code`가 있으면 수정, 없으면 새 문서 생성입니다.
pub async fn generate_code(
    client: &dyn CompletionClient,
    enhanced_prompt: &str,
    current_code: Option<&str>,
) -> Result<String, AppError> {
    let reply = match current_code {
        Some(code) => {
            let user = format!(
                "Here's the current website code: \"{}\" The user wants this change: \"{}\"",
                code, enhanced_prompt
            );
            client.complete(REVISION_INSTRUCTION, &user).await?
        }
        None => {
            client
                .complete(&creation_instruction(enhanced_prompt), enhanced_prompt)
                .await?
        }
    };

    let code = strip_code_fences(&reply);
    if code.is_empty() {
        return Err(AppError::GenerationFailure(
            "code generation returned no content".to_string(),
        ));
    }
    Ok(code)
}

/// 모든 코드 펜스 표시를 제거합니다.
/// 여는 펜스는 언어 태그와 줄바꿈까지 (```html\n), 나머지 ```는 그 자체만 지웁니다.
pub fn strip_code_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find("```") {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 3..];

        let tag_len = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        if rest[tag_len..].starts_with('\n') {
            rest = &rest[tag_len + 1..];
        }
    }
    out.push_str(rest);

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::completion::testing::ScriptedCompletion;

    #[test]
    fn strips_fenced_block() {
        let raw = "```html\n<!DOCTYPE html><html></html>\n```";
        assert_eq!(strip_code_fences(raw), "<!DOCTYPE html><html></html>");
    }

    #[test]
    fn strips_uppercase_tag_and_bare_fences() {
        assert_eq!(strip_code_fences("```HTML\n<p>x</p>```"), "<p>x</p>");
        assert_eq!(strip_code_fences("```\n<p>x</p>\n```\n"), "<p>x</p>");
    }

    #[test]
    fn plain_html_is_only_trimmed() {
        assert_eq!(strip_code_fences("  <p>a ` b</p>\n"), "<p>a ` b</p>");
    }

    #[test]
    fn fence_only_output_is_empty() {
        assert_eq!(strip_code_fences("```html\n```"), "");
    }

    #[tokio::test]
    async fn revision_embeds_current_document() {
        let client = ScriptedCompletion::new(["```html\n<html>new</html>\n```"]);

        let code = generate_code(&client, "make it red", Some("<html>old</html>"))
            .await
            .unwrap();

        assert_eq!(code, "<html>new</html>");
        let calls = client.calls.lock().unwrap();
        assert_eq!(calls[0].0, REVISION_INSTRUCTION);
        assert!(calls[0].1.contains("<html>old</html>"));
        assert!(calls[0].1.contains("make it red"));
    }

    #[tokio::test]
    async fn creation_puts_prompt_in_instruction() {
        let client = ScriptedCompletion::new(["<html>bakery</html>"]);

        generate_code(&client, "a cosy bakery", None).await.unwrap();

        let calls = client.calls.lock().unwrap();
        assert!(calls[0].0.contains("\"a cosy bakery\""));
        assert!(calls[0].0.contains(TAILWIND_SCRIPT));
        assert_eq!(calls[0].1, "a cosy bakery");
    }

    #[tokio::test]
    async fn fences_only_is_generation_failure() {
        let client = ScriptedCompletion::new(["```\n```"]);
        let err = generate_code(&client, "x", None).await.unwrap_err();
        assert!(err.is_generation_failure());
    }
}
