use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use otel_stack::config::{self, Settings, StackConfig};
use otel_stack::stack::MainStack;
use otel_stack::writer;

const DEFAULT_SETTINGS_PATH: &str = "otel-stack.yaml";

/// Synthesize the Terraform configuration for the app service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML settings file (app name, stack name, region, image tag overrides)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Directory the synthesized stack is written to
    #[arg(long, default_value = "cdktf.out")]
    out: PathBuf,
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let (path, explicit) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_SETTINGS_PATH), false),
    };

    match config::parse(path) {
        Ok(settings) => Ok(settings),
        Err(config::Error::FileNotFound(_)) if !explicit => {
            info!("no settings file found, using defaults");
            Ok(Settings::default())
        }
        Err(error) => {
            Err(error).with_context(|| format!("Failed to load settings from {}", path.display()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let env: HashMap<String, String> = std::env::vars().collect();
    let env = config::consume_env(&env).context("Invalid environment")?;
    let settings = load_settings(cli.settings.as_deref())?;
    let region = config::resolve_region(settings.region.as_deref()).await;

    let stack_config = StackConfig::new(env, &settings, region);
    let stack = MainStack::new(&stack_config).context("Failed to assemble the stack")?;

    let path = writer::write(&cli.out, &settings.stack_name, &stack.synth())
        .context("Failed to write the synthesized stack")?;
    info!(path = %path.display(), stack = %settings.stack_name, "stack synthesized");

    return Ok(());
}
