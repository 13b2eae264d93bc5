//! Dialogue stage: rewritten narrative -> line-oriented dialogue script.
//!
//! The output contract is `Speaker: line`, optionally with an emotion tag
//! and optionally grouped under scene headers. The no-screenplay rules are
//! enforced at the prompt level only; the stage does not post-validate the
//! completion against them.

use crate::error::{PipelineError, Result};
use crate::llm::{strip_code_blocks, LlmClient};
use crate::script::Character;

const SYSTEM_PROMPT: &str = "You convert stories into clean dialogue scripts. \
Return ONLY the dialogue text, no explanation.";

fn build_prompt(rewritten: &str, characters: &[Character]) -> String {
    let names = if characters.is_empty() {
        "Use names from the story".to_string()
    } else {
        characters
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "Convert the following story into clean dialogues.\n\n\
         STRICT RULES:\n\
         - NO screenplay format (no CUT TO, FADE IN, INT/EXT)\n\
         - NO scene directions like camera movements\n\
         - NO narration, only dialogues\n\
         - Only use characters from the provided list\n\
         - Use this structure:\n\n\
         Scene 1:\n\
         Character: line\n\
         Character (emotion): line\n\n\
         Scene 2:\n\
         ...\n\n\
         Story:\n{rewritten}\n\n\
         Characters list to reference:\n{names}"
    )
}

/// Run the dialogue conversion against the injected capability.
pub async fn run(
    llm: &dyn LlmClient,
    rewritten_text: &str,
    characters: &[Character],
) -> Result<String> {
    if rewritten_text.trim().is_empty() {
        return Err(PipelineError::MissingPrerequisite {
            stage: "dialogue",
            field: "rewritten_text",
        });
    }

    let completion = llm
        .chat(SYSTEM_PROMPT, &build_prompt(rewritten_text, characters))
        .await?;
    let dialogue = strip_code_blocks(&completion);
    if dialogue.trim().is_empty() {
        return Err(PipelineError::EmptyGeneration);
    }
    Ok(dialogue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct StubLlm {
        reply: String,
        last_prompt: std::sync::Mutex<String>,
    }

    impl StubLlm {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                last_prompt: std::sync::Mutex::new(String::new()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn chat(&self, _system: &str, user: &str) -> Result<String> {
            *self.last_prompt.lock().unwrap() = user.to_string();
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn test_dialogue_from_story() {
        let llm = StubLlm::new("Scene 1:\nMira: We made it.\nTomas (tired): Barely.");
        let characters = vec![
            Character {
                name: "Mira".into(),
                description: None,
            },
            Character {
                name: "Tomas".into(),
                description: None,
            },
        ];
        let dialogue = run(&llm, "A story about Mira and Tomas.", &characters)
            .await
            .unwrap();
        assert!(dialogue.starts_with("Scene 1:"));

        // The character constraint reaches the prompt.
        let prompt = llm.last_prompt.lock().unwrap().clone();
        assert!(prompt.contains("Mira, Tomas"));
    }

    #[tokio::test]
    async fn test_no_character_list_frees_names() {
        let llm = StubLlm::new("Someone: hello");
        run(&llm, "A story.", &[]).await.unwrap();
        let prompt = llm.last_prompt.lock().unwrap().clone();
        assert!(prompt.contains("Use names from the story"));
    }

    #[tokio::test]
    async fn test_empty_rewritten_is_missing_prerequisite() {
        let llm = StubLlm::new("irrelevant");
        let err = run(&llm, "", &[]).await.unwrap_err();
        assert_eq!(err.kind(), "MissingPrerequisite");
    }

    #[tokio::test]
    async fn test_empty_completion_is_empty_generation() {
        let llm = StubLlm::new("```\n\n```");
        let err = run(&llm, "A story.", &[]).await.unwrap_err();
        assert_eq!(err.kind(), "EmptyGeneration");
    }
}
