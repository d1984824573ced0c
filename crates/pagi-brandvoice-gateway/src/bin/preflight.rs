//! Preflight: checks the generation credential before the gateway goes live.
//! Lists models visible to the key, confirms the configured model, then makes one test call.
//! Run with: cargo run --bin preflight

use anyhow::Context;
use pagi_brandvoice_core::{BrandVoiceConfig, GenerationClient, GenerationError};
use std::time::Instant;

const TEST_INSTRUCTION: &str = "Reply with one short friendly sentence introducing a comfortable armchair.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config = BrandVoiceConfig::load().context("failed to load brand voice configuration")?;
    config.validate().context("brand voice configuration is incomplete")?;

    let client = GenerationClient::from_config(&config.generation)?;
    let backend = client.backend();
    println!("[PREFLIGHT] Provider: {}", backend.provider());
    println!("[PREFLIGHT] Model:    {}", backend.model());

    match backend.list_models().await {
        Ok(models) => {
            println!("[PREFLIGHT] {} models visible to this key", models.len());
            if models.iter().any(|m| m == backend.model()) {
                println!("[PREFLIGHT] Configured model is available");
            } else {
                println!("[PREFLIGHT] WARNING: configured model not in the list; check generation.model");
            }
        }
        Err(e) => println!("[PREFLIGHT] Model listing failed ({:?}): {}", e.kind(), e.detail()),
    }

    let started = Instant::now();
    match client.generate(TEST_INSTRUCTION).await {
        Ok(text) => {
            println!("[PREFLIGHT] Test call OK in {} ms", started.elapsed().as_millis());
            println!("[PREFLIGHT] Reply: {}", text);
            Ok(())
        }
        Err(e @ GenerationError::RateLimited(_)) => {
            println!("[PREFLIGHT] QUOTA EXHAUSTED: {}", e.user_notice());
            anyhow::bail!("rate limited: {}", e.detail())
        }
        Err(e) => {
            println!("[PREFLIGHT] Test call failed: {}", e.user_notice());
            Err(e).context("test generation failed")
        }
    }
}
