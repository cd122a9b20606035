use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use shutterline::config::{Config, LoggingConfig};
use shutterline::params::{parse_query, resolve, Schema};
use shutterline::pipeline::{ImageRequest, Pipeline};
use shutterline::storage::{MemoryObjectStore, ObjectStore, S3ObjectStore};

/// Shutterline - Imgix-compatible image transformations over S3
#[derive(Parser, Debug)]
#[command(name = "shutterline")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults to environment variables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a query string and print the edit plan as JSON
    Plan {
        #[arg(short, long, default_value = "")]
        query: String,

        /// Include implicit (defaulted and undefined) parameters
        #[arg(long)]
        all: bool,
    },

    /// Transform one object and write the result
    Render {
        /// Object key
        key: String,

        #[arg(short, long, default_value = "")]
        query: String,

        /// Accept header to negotiate formats against
        #[arg(long)]
        accept: Option<String>,

        /// Read the original from a local file instead of S3
        #[arg(long)]
        input: Option<PathBuf>,

        #[arg(short, long)]
        output: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path),
        None => Config::from_env(),
    }
    .map_err(anyhow::Error::msg)
    .context("Failed to load configuration")?;

    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Plan { query, all } => {
            let logging = match &args.config {
                Some(path) => load_config(Some(path))?.logging,
                None => LoggingConfig::default(),
            };
            shutterline::logging::init_subscriber(&logging)
                .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

            let plan = resolve(&parse_query(&query), Schema::builtin())?;
            let output = if all {
                serde_json::to_string_pretty(&plan)?
            } else {
                serde_json::to_string_pretty(&plan.explicit_json())?
            };
            println!("{}", output);
        }
        Command::Render {
            key,
            query,
            accept,
            input,
            output,
        } => {
            let config = load_config(args.config.as_ref())?;
            shutterline::logging::init_subscriber(&config.logging)
                .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

            tracing::info!(
                bucket = %config.service.source_bucket,
                endpoint = ?config.service.endpoint,
                "Configuration loaded successfully"
            );

            let request = ImageRequest::new(&key, query);
            let store: Arc<dyn ObjectStore> = match input {
                Some(path) => {
                    let body = tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    let store = MemoryObjectStore::new(config.service.source_bucket.clone());
                    store.insert(request.key.clone(), body, None).await;
                    Arc::new(store)
                }
                None => Arc::new(S3ObjectStore::from_config(&config.service).await),
            };

            let request = match accept {
                Some(accept) => request.with_accept(accept),
                None => request,
            };

            let pipeline = Pipeline::new(store, config.service);
            let response = pipeline.handle(&request).await;
            if response.status != 200 {
                bail!(
                    "Request failed with status {}: {}",
                    response.status,
                    String::from_utf8_lossy(&response.body)
                );
            }

            tokio::fs::write(&output, &response.body)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;

            tracing::info!(
                output = %output.display(),
                content_type = %response.content_type,
                bytes = response.body.len(),
                "Wrote transformed image"
            );
        }
    }

    Ok(())
}
