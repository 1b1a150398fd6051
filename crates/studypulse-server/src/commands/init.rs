//! The `studypulse init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("studypulse.toml").exists() {
        println!("studypulse.toml already exists, skipping.");
    } else {
        std::fs::write("studypulse.toml", SAMPLE_CONFIG)?;
        println!("Created studypulse.toml");
    }

    println!("\nNext steps:");
    println!("  1. Export OPENAI_API_KEY and JWT_SECRET (or edit studypulse.toml)");
    println!("  2. Run: studypulse create-user --email you@example.com --name You --password <pw> --admin");
    println!("  3. Run: studypulse serve");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# StudyPulse configuration

database_url = "sqlite://studypulse.db?mode=rwc"

[server]
host = "127.0.0.1"
port = 5000
cors_origin = "http://localhost:5173"
# jwt_secret = "change-me"    # or export JWT_SECRET
token_ttl_hours = 24
max_upload_bytes = 20971520
allow_admin_signup = false

[quiz]
default_count = 10
max_count = 50
theory_match_threshold = 0.6
recent_window = 10

[llm]
default_provider = "openai"
default_model = "gpt-4"
temperature = 0.7
max_tokens = 1000
max_retries = 3
retry_delay_ms = 1000
min_request_interval_ms = 1000
chunk_size = 4000
parallelism = 1

[llm.providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[llm.providers.ollama]
type = "ollama"
base_url = "http://localhost:11434"
"#;
