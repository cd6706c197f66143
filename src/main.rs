//! screen-locator CLI: locate a described element or build a labeled element tree.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use screen_locator::config::{load_config, AppConfig};
use screen_locator::errors::{LocatorError, LocatorResult};
use screen_locator::llm::providers::gemini::GeminiProvider;
use screen_locator::perception::pipeline::{run_locate, run_snapshot, ErrorEnvelope};

#[derive(Parser)]
#[command(name = "screen-locator")]
#[command(about = "Find UI elements in screenshots with a vision model")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate a described element and print its pixel coordinates.
    Locate {
        /// Path to the screenshot.
        image: PathBuf,

        /// Natural-language description of the target.
        description: String,

        /// Write the segmentation mask to the temp directory.
        #[arg(long)]
        debug: bool,
    },
    /// Produce a validated element tree with refs.
    Snapshot {
        /// Path to the screenshot.
        image: PathBuf,

        /// Extra context for the model (e.g. "this is a bar chart").
        #[arg(long)]
        hint: Option<String>,

        /// Override the tree model from config.
        #[arg(long)]
        model: Option<String>,

        /// Also write `<stem>_labeled.png` with boxes and refs.
        #[arg(long)]
        render: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    screen_locator::init_tracing();

    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            emit(&ErrorEnvelope::from(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> LocatorResult<ExitCode> {
    let config = load_config()?;
    let provider = GeminiProvider::from_config(&config.vision)?;

    match command {
        Commands::Locate {
            image,
            description,
            debug,
        } => {
            require_file(&image)?;
            let report = run_locate(&provider, &image, &description, &config.marker, debug).await?;
            emit(&report);
            Ok(if report.detected {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Snapshot {
            image,
            hint,
            model,
            render,
        } => {
            require_file(&image)?;
            let model = tree_model(&config, model);
            let report = run_snapshot(
                &provider,
                &image,
                hint.as_deref(),
                &model,
                render,
                &config.render,
            )
            .await?;
            emit(&report);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn require_file(path: &Path) -> LocatorResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(LocatorError::ImageNotFound(path.display().to_string()))
    }
}

fn tree_model(config: &AppConfig, requested: Option<String>) -> String {
    requested.unwrap_or_else(|| config.vision.tree_model.clone())
}

/// Print one pretty JSON document to stdout.
fn emit<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!(error = %e, "failed to serialize output"),
    }
}
