use std::path::PathBuf;

use anyhow::{anyhow, Context};
use dotenvy::dotenv;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

mod backend;
mod compiler;
mod config;
mod shoot;
mod utils;

use compiler::batch::BatchRequest;
use compiler::request::ShootRequest;
use config::CONFIG;
use shoot::credits::{CreditLedger, InMemoryLedger, Unmetered};
use shoot::{ServiceSettings, ShootService};
use utils::logging::init_logging;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Preview,
    Generate,
    BatchPreview,
    Batch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliArgs {
    mode: Mode,
    file_path: PathBuf,
    concurrency: Option<usize>,
    credits: Option<u32>,
}

fn usage() -> &'static str {
    "Usage: cargo run -- <preview|generate|batch-preview|batch> --file <request.json> [--concurrency <n>] [--credits <n>]"
}

fn parse_args(args: &[String]) -> anyhow::Result<CliArgs> {
    let mode = match args.get(1).map(|value| value.as_str()) {
        Some("preview") => Mode::Preview,
        Some("generate") => Mode::Generate,
        Some("batch-preview") => Mode::BatchPreview,
        Some("batch") => Mode::Batch,
        Some("--help") | Some("-h") | None => return Err(anyhow!(usage())),
        Some(other) => return Err(anyhow!("Unknown command: {other}\n{}", usage())),
    };

    let mut file_path: Option<PathBuf> = None;
    let mut concurrency = None;
    let mut credits = None;

    let mut index = 2;
    while index < args.len() {
        match args[index].as_str() {
            "--file" => {
                index += 1;
                let value = args
                    .get(index)
                    .ok_or_else(|| anyhow!("Missing value for --file"))?;
                file_path = Some(PathBuf::from(value));
            }
            "--concurrency" => {
                index += 1;
                let value = args
                    .get(index)
                    .ok_or_else(|| anyhow!("Missing value for --concurrency"))?;
                concurrency = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| anyhow!("Invalid --concurrency value: {value}"))?
                        .max(1),
                );
            }
            "--credits" => {
                index += 1;
                let value = args
                    .get(index)
                    .ok_or_else(|| anyhow!("Missing value for --credits"))?;
                credits = Some(
                    value
                        .parse::<u32>()
                        .map_err(|_| anyhow!("Invalid --credits value: {value}"))?,
                );
            }
            "--help" | "-h" => {
                return Err(anyhow!(usage()));
            }
            other => {
                return Err(anyhow!("Unknown argument: {other}\n{}", usage()));
            }
        }
        index += 1;
    }

    let file_path = file_path.ok_or_else(|| anyhow!("--file is required\n{}", usage()))?;
    if concurrency.is_some() && mode != Mode::Batch {
        warn!("--concurrency only applies to batch runs; ignoring");
    }

    Ok(CliArgs {
        mode,
        file_path,
        concurrency,
        credits,
    })
}

async fn read_json<T: DeserializeOwned>(path: &PathBuf) -> anyhow::Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let _guards = init_logging();

    let args: Vec<String> = std::env::args().collect();
    let cli = parse_args(&args)?;

    let ledger: Box<dyn CreditLedger> = match cli.credits {
        Some(balance) => Box::new(InMemoryLedger::new(balance)),
        None => Box::new(Unmetered),
    };
    let service = ShootService::new(
        backend::make_configured_backend(),
        ledger,
        ServiceSettings::from_config(),
    );
    info!(
        "Starting shoot compiler (backend={})",
        CONFIG.backend_provider.as_str()
    );

    match cli.mode {
        Mode::Preview => {
            let request: ShootRequest = read_json(&cli.file_path).await?;
            print_json(&service.preview(&request)?)?;
        }
        Mode::Generate => {
            let request: ShootRequest = read_json(&cli.file_path).await?;
            print_json(&service.generate(&request).await?)?;
        }
        Mode::BatchPreview => {
            let batch: BatchRequest = read_json(&cli.file_path).await?;
            print_json(&service.preview_batch(&batch)?)?;
        }
        Mode::Batch => {
            let mut batch: BatchRequest = read_json(&cli.file_path).await?;
            if cli.concurrency.is_some() {
                batch.concurrency = cli.concurrency;
            }

            let stop = service.stop_signal();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Stop requested; remaining shots will be skipped");
                    stop.request_stop();
                }
            });

            let report = service.run_batch(&batch).await?;
            print_json(&report)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        std::iter::once("shootc")
            .chain(values.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn parses_batch_flags() {
        let cli = parse_args(&args(&["batch", "--file", "batch.json", "--concurrency", "0"]))
            .expect("valid args");
        assert_eq!(cli.mode, Mode::Batch);
        assert_eq!(cli.file_path, PathBuf::from("batch.json"));
        assert_eq!(cli.concurrency, Some(1));
        assert_eq!(cli.credits, None);
    }

    #[test]
    fn rejects_missing_file_and_unknown_commands() {
        assert!(parse_args(&args(&["preview"])).is_err());
        assert!(parse_args(&args(&["render", "--file", "x.json"])).is_err());
        assert!(parse_args(&args(&["generate", "--file"])).is_err());
        assert!(parse_args(&args(&["generate", "--file", "x.json", "--credits", "abc"])).is_err());
    }
}
