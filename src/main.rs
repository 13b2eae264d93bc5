use anyhow::{Context, Result};
use storycast::config::Config;
use storycast::error::StageFailure;
use storycast::llm;
use storycast::pipeline::{ExportVariant, Pipeline};
use storycast::tts::HttpSpeechClient;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .context("Usage: storycast <story.pdf|story.docx>")?;

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            eprintln!("Please ensure 'config.yml' exists with valid LLM settings.");
            return Err(e);
        }
    };
    config.ensure_directories()?;

    let llm = llm::create_llm(&config)?;
    let speech = Box::new(HttpSpeechClient::new(&config.speech));
    let pipeline = Pipeline::new(config, llm, speech);

    let file_name = std::path::Path::new(&path)
        .file_name()
        .and_then(|n| n.to_str())
        .context("Invalid input path")?
        .to_string();
    let bytes = std::fs::read(&path).with_context(|| format!("Failed to read {}", path))?;

    // Run the stages in order; any stage failure is reported with its
    // structured kind and leaves the script retryable at that stage.
    let run = async {
        let upload = pipeline.upload(&file_name, &bytes).await?;
        println!("Script {} created ({} chars extracted)", upload.id, upload.raw_text.len());

        let rewrite = pipeline.rewrite(&upload.id, None).await?;
        println!(
            "Rewritten ({} chars, {} characters found)",
            rewrite.rewritten_text.len(),
            rewrite.characters.len()
        );

        let dialogue = pipeline.dialogue(&upload.id).await?;
        println!("Dialogue ready ({} lines)", dialogue.lines().count());

        let clips = pipeline.synthesize(&upload.id).await?;
        println!("Synthesized {} clips", clips.len());

        let doc = pipeline.export(&upload.id, ExportVariant::Rewritten).await?;
        let out = format!("export-{}", doc.file_name);
        std::fs::write(&out, &doc.bytes)?;
        println!("Exported rewritten story to {}", out);

        let script = pipeline.get(&upload.id)?;
        println!(
            "Done. Final audio: {}",
            script.final_audio_path.as_deref().unwrap_or("-")
        );
        Ok::<(), storycast::error::PipelineError>(())
    };

    if let Err(err) = run.await {
        let failure = StageFailure::from(&err);
        eprintln!("{}", serde_json::to_string_pretty(&failure)?);
        anyhow::bail!("pipeline stage failed: {}", failure.error_kind);
    }

    Ok(())
}
