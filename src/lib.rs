pub mod audio;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod extract;
pub mod llm;
pub mod pipeline;
pub mod render;
pub mod rewrite;
pub mod script;
pub mod store;
pub mod tts;
