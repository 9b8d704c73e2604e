//! Validate command implementation

use anyhow::{Context, Result};
use colored::Colorize;
use futures::StreamExt;
use genbench_backend::{BackendClient, BackendRequest, Message, MessageRole};
use std::time::{Duration, Instant};
use tracing::info;

use crate::cli::ValidateArgs;
use crate::config::Settings;

/// Run the validate command
pub async fn run(args: ValidateArgs, mut settings: Settings, json_output: bool, quiet: bool) -> Result<()> {
    info!("Starting validate command");

    if let Some(target) = &args.target {
        settings.target = target.clone();
    }
    if args.api_key.is_some() {
        settings.api_key = args.api_key.clone();
    }

    if !quiet && !json_output {
        println!("{} Validating configuration...", "=>".bright_cyan().bold());
    }

    settings.validate().context("configuration validation failed")?;

    if !quiet && !json_output {
        println!("{} Configuration is structurally valid", "✓".bright_green());
        println!("{} Checking connectivity to {}...", "=>".bright_cyan(), settings.target.bright_yellow());
    }

    let client = BackendClient::new(settings.to_backend_config());
    let request = BackendRequest::chat(
        settings.model.clone(),
        vec![Message { role: MessageRole::User, content: "ping".to_string() }],
    );
    let deadline = Instant::now() + Duration::from_secs(10);

    let mut stream = client.stream(request, Some(deadline));
    let mut connectivity_ok = false;
    let mut last_error: Option<String> = None;

    while let Some(event) = stream.next().await {
        match event {
            Ok(_) => connectivity_ok = true,
            Err(err) => {
                last_error = Some(err.to_string());
                break;
            }
        }
    }

    if json_output {
        let payload = serde_json::json!({
            "target": settings.target,
            "model": settings.model,
            "config_valid": true,
            "connectivity": connectivity_ok,
            "error": last_error,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if !quiet {
        if connectivity_ok {
            println!("{} Target responded successfully", "✓".bright_green().bold());
        } else {
            println!(
                "{} Target did not respond successfully{}",
                "✗".bright_red().bold(),
                last_error.map(|e| format!(": {e}")).unwrap_or_default()
            );
        }
    }

    if !connectivity_ok {
        anyhow::bail!("connectivity check failed for target {}", settings.target);
    }

    Ok(())
}
