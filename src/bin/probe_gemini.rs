//! Probe binary for verifying Gemini API access and the retry client
//! This is a utility binary, not part of the main application

use skinrx_backend::config::Config;
use skinrx_backend::inference::gemini_types::RequestContent;
use skinrx_backend::inference::{
    BackoffClient, GenerateRequest, InferenceBackend, InferenceError, RequestError,
};
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("Probing the Gemini API from Rust...\n");

    // Step 1: Configuration
    println!("1. Loading configuration...");
    let config = Config::from_env();
    config.validate()?;
    if config.gemini.api_key.is_empty() {
        eprintln!("   ✗ GEMINI_API_KEY not found in environment");
        eprintln!("   Make sure to export it: export GEMINI_API_KEY=\"your-key\"");
        return Err("GEMINI_API_KEY not set".into());
    }
    println!(
        "   ✓ GEMINI_API_KEY is set (length: {} chars)",
        config.gemini.api_key.len()
    );
    println!("   Model: {}", config.gemini.model);
    println!("   Base URL: {}", config.gemini.base_url);
    println!(
        "   Retry: {} attempts, {}ms base delay",
        config.retry.max_attempts, config.retry.backoff_base_ms
    );

    // Step 2: Client
    println!("\n2. Building backoff client...");
    let client = BackoffClient::from_config(&config.gemini, config.retry.policy())?;
    println!("   ✓ Client ready");

    // Step 3: Query
    println!("\n3. Executing test query...");
    println!("   Query: 'What is 2+2? Answer in one sentence.'");
    let request = GenerateRequest::new(vec![RequestContent::text(
        "What is 2+2? Answer in one sentence.",
    )]);

    let start = Instant::now();
    match client.generate(request).await {
        Ok(text) => {
            println!("   ✓ Response received in {:?}:", start.elapsed());
            println!("   {}", text.trim());
        }
        Err(InferenceError::Request(RequestError::Status { status, body })) => {
            eprintln!("   ✗ Request failed with status {}", status);
            eprintln!("   {}", body);
            eprintln!("\n   Troubleshooting:");
            eprintln!("   - 400/403: check the API key and model name");
            eprintln!("   - 404: check GEMINI_MODEL and GEMINI_API_BASE_URL");
            return Err(format!("status {}", status).into());
        }
        Err(e) => {
            eprintln!("   ✗ Query failed after {:?}: {}", start.elapsed(), e);
            return Err(e.into());
        }
    }

    println!("\n✓ All checks passed!");
    Ok(())
}
