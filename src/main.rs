//! toolscout CLI entry point
//!
//! - `toolscout research <query>` - research and compare developer tools
//! - `toolscout init [path]` - write a commented toolscout.toml
//! - `toolscout config` - show or validate the effective configuration

use anyhow::Context;
use owo_colors::OwoColorize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use toolscout::cli::init::{self, InitConfig, InitResult};
use toolscout::cli::output::Output;
use toolscout::cli::{Cli, Commands};
use toolscout::evidence::DaedraGateway;
use toolscout::research::ResearchPipeline;
use toolscout::utils::logging::init_tracing;
use toolscout::utils::toml_config::ToolscoutConfig;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match &cli.command {
        Commands::Init {
            path,
            force,
            provider,
        } => {
            let config = InitConfig {
                path: path.clone(),
                force: *force,
                provider: provider.clone(),
            };
            match init::run(config, &output) {
                InitResult::Success | InitResult::AlreadyExists => Ok(()),
                InitResult::Error(e) => Err(anyhow::anyhow!(e)),
            }
        }
        Commands::Config { validate } => {
            let config = ToolscoutConfig::load_or_default(&cli.config)
                .with_context(|| format!("invalid configuration in {}", cli.config.display()))?;
            if !cli.config.exists() {
                output.info("No configuration file found, using built-in defaults");
            }
            if *validate {
                output.success("Configuration is valid");
            } else {
                println!("{}", config.to_toml()?);
            }
            Ok(())
        }
        Commands::Research {
            json,
            global_timeout_ms,
            ..
        } => {
            let config = ToolscoutConfig::load_or_default(&cli.config)
                .with_context(|| format!("invalid configuration in {}", cli.config.display()))?;
            init_tracing(&config.logging, cli.verbose)
                .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

            let request = cli
                .command
                .research_request()
                .context("research command without a request")?;
            let mut pipeline_config = config.pipeline.with_request(&request)?;
            if global_timeout_ms.is_some() {
                pipeline_config.global_timeout_ms = *global_timeout_ms;
                pipeline_config.validate()?;
            }

            let llm = config.provider.to_provider()?.create_client()?;
            let gateway = Arc::new(DaedraGateway::new(config.search.limits()));
            let pipeline = ResearchPipeline::new(gateway, llm);

            let cancel = CancellationToken::new();
            let _interrupt = {
                let cancel = cancel.clone();
                AbortOnDropHandle::new(tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        tracing::warn!("interrupted, finishing with partial results");
                        cancel.cancel();
                    }
                }))
            };

            let state = pipeline
                .run_with_cancellation(&request.query, &pipeline_config, cancel)
                .await?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&state.into_response())?);
            } else {
                output.research_report(&state);
            }
            Ok(())
        }
    }
}
