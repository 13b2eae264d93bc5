use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Root for script records, per-script clips and merged audio.
    #[serde(default = "default_data")]
    pub data_folder: String,

    pub llm: LlmConfig,

    #[serde(default)]
    pub speech: SpeechConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    pub provider: String, // "openai" or "ollama"
    pub openai: Option<OpenAIConfig>,
    pub ollama: Option<OllamaConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpeechConfig {
    #[serde(default = "default_speech_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    /// Model path appended to the inference base URL.
    #[serde(default = "default_speech_model")]
    pub model: String,

    /// Voice used when a line carries no recognizable speaker prefix.
    #[serde(default = "default_narrator_voice")]
    pub narrator_voice: String,

    /// Speaker name -> voice id. Unknown speakers fall back to the narrator.
    #[serde(default)]
    pub voices: HashMap<String, String>,

    /// Upper bound on in-flight synthesis calls per script.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: default_speech_base_url(),
            api_key: String::new(),
            model: default_speech_model(),
            narrator_voice: default_narrator_voice(),
            voices: HashMap::new(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_data() -> String {
    "data".to_string()
}
fn default_speech_base_url() -> String {
    "https://api-inference.huggingface.co/models".to_string()
}
fn default_speech_model() -> String {
    "coqui/XTTS-v2".to_string()
}
fn default_narrator_voice() -> String {
    "narrator".to_string()
}
fn default_concurrency() -> usize {
    4
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Path::new("config.yml");
        if !path.exists() {
            anyhow::bail!("config.yml not found. Please create one.");
        }

        let content = fs::read_to_string(path).context("Failed to read config.yml")?;
        let config: Config =
            serde_yaml_ng::from_str(&content).context("Failed to parse config.yml")?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let content = serde_yaml_ng::to_string(self)?;
        fs::write("config.yml", content).context("Failed to write config.yml")?;
        Ok(())
    }

    pub fn ensure_directories(&self) -> Result<()> {
        let root = Path::new(&self.data_folder);
        fs::create_dir_all(root.join("scripts"))?;
        fs::create_dir_all(root.join("clips"))?;
        fs::create_dir_all(root.join("audio"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
llm:
  provider: openai
  openai:
    api_key: sk-test
    model: test-model
"#;
        let config: Config = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.data_folder, "data");
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.speech.narrator_voice, "narrator");
        assert_eq!(config.speech.concurrency, 4);
    }

    #[test]
    fn test_parse_voice_map() {
        let yaml = r#"
llm:
  provider: ollama
  ollama:
    base_url: http://127.0.0.1:11434
    model: llama3
speech:
  narrator_voice: calm-male
  voices:
    Mira: bright-female
"#;
        let config: Config = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.speech.voices.get("Mira").unwrap(), "bright-female");
        assert_eq!(config.speech.narrator_voice, "calm-male");
    }
}
