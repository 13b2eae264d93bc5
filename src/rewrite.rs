//! Rewrite stage: raw extracted text -> cleaned narrative + character list.
//!
//! Effectful and non-idempotent: every run hands the text to the model
//! again and may come back different. Re-running overwrites the previous
//! rewrite; it never replays it.

use crate::error::{PipelineError, Result};
use crate::llm::{strip_code_blocks, LlmClient};
use crate::script::Character;
use serde::Deserialize;

pub const DEFAULT_STYLE: &str = "clean, structured scenes with dialogue where appropriate";

const SYSTEM_PROMPT: &str = "You are a professional story rewriting AI. \
Do NOT invent new characters. Do NOT change the meaning. \
Improve clarity, immersion, pacing, and flow. \
Return ONLY a JSON object, no explanation.";

#[derive(Debug)]
pub struct RewriteOutcome {
    pub rewritten_text: String,
    pub characters: Vec<Character>,
}

#[derive(Deserialize)]
struct RewriteCompletion {
    rewritten: String,
    #[serde(default)]
    characters: Vec<Character>,
}

fn build_prompt(raw_text: &str, style: &str) -> String {
    format!(
        "Rewrite the given story in the following style: {style}.\n\
         Return a JSON object with exactly these fields:\n\
         {{ \"rewritten\": \"the full rewritten story\",\n\
         \"characters\": [ {{ \"name\": \"...\", \"description\": \"...\" }} ] }}\n\
         List every speaking character that appears in the story.\n\n\
         Story:\n{raw_text}"
    )
}

/// Run the rewrite against the injected capability.
///
/// The completion is expected as JSON but tolerated as prose: a completion
/// that does not parse is kept verbatim as the rewritten text with an empty
/// character list.
pub async fn run(llm: &dyn LlmClient, raw_text: &str, style: &str) -> Result<RewriteOutcome> {
    if raw_text.trim().is_empty() {
        return Err(PipelineError::MissingPrerequisite {
            stage: "rewrite",
            field: "raw_text",
        });
    }

    let completion = llm.chat(SYSTEM_PROMPT, &build_prompt(raw_text, style)).await?;
    parse_completion(&completion)
}

fn parse_completion(completion: &str) -> Result<RewriteOutcome> {
    let clean = strip_code_blocks(completion);
    if clean.trim().is_empty() {
        return Err(PipelineError::EmptyGeneration);
    }

    match serde_json::from_str::<RewriteCompletion>(&clean) {
        Ok(parsed) => {
            if parsed.rewritten.trim().is_empty() {
                return Err(PipelineError::EmptyGeneration);
            }
            Ok(RewriteOutcome {
                rewritten_text: parsed.rewritten,
                characters: parsed.characters,
            })
        }
        // Model ignored the JSON contract; treat the whole completion as
        // the rewritten narrative.
        Err(_) => Ok(RewriteOutcome {
            rewritten_text: clean,
            characters: Vec::new(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct StubLlm(String);

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn chat(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_json_completion_with_characters() {
        let llm = StubLlm(
            r#"```json
{ "rewritten": "A tale, retold.", "characters": [ { "name": "Mira", "description": "a wanderer" } ] }
```"#
                .to_string(),
        );
        let outcome = run(&llm, "A tale.", DEFAULT_STYLE).await.unwrap();
        assert_eq!(outcome.rewritten_text, "A tale, retold.");
        assert_eq!(outcome.characters.len(), 1);
        assert_eq!(outcome.characters[0].name, "Mira");
    }

    #[tokio::test]
    async fn test_prose_completion_falls_back() {
        let llm = StubLlm("Just a rewritten story, no JSON.".to_string());
        let outcome = run(&llm, "A tale.", DEFAULT_STYLE).await.unwrap();
        assert_eq!(outcome.rewritten_text, "Just a rewritten story, no JSON.");
        assert!(outcome.characters.is_empty());
    }

    #[tokio::test]
    async fn test_empty_completion_is_empty_generation() {
        let llm = StubLlm("   \n".to_string());
        let err = run(&llm, "A tale.", DEFAULT_STYLE).await.unwrap_err();
        assert_eq!(err.kind(), "EmptyGeneration");
    }

    #[tokio::test]
    async fn test_json_with_empty_rewritten_is_empty_generation() {
        let llm = StubLlm(r#"{ "rewritten": " ", "characters": [] }"#.to_string());
        let err = run(&llm, "A tale.", DEFAULT_STYLE).await.unwrap_err();
        assert_eq!(err.kind(), "EmptyGeneration");
    }

    #[tokio::test]
    async fn test_empty_input_is_missing_prerequisite() {
        let llm = StubLlm("irrelevant".to_string());
        let err = run(&llm, "  ", DEFAULT_STYLE).await.unwrap_err();
        assert_eq!(err.kind(), "MissingPrerequisite");
    }
}
