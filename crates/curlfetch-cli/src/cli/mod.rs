//! CLI for the curlfetch batch downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use curlfetch_core::config;

use commands::{run_config, run_fetch, FetchArgs};

/// Top-level CLI for curlfetch.
#[derive(Debug, Parser)]
#[command(name = "curlfetch")]
#[command(about = "Fetch many URLs concurrently under one deadline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Register every URL, fetch them in one batch and print one result per URL.
    Fetch {
        /// Direct HTTP/HTTPS URLs, fetched concurrently.
        #[arg(required = true)]
        urls: Vec<String>,

        /// Time budget for the whole batch, in milliseconds.
        #[arg(long, default_value = "5000", value_name = "MS")]
        timeout_ms: u64,

        /// HTTP method for every request.
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Extra request header ("Name: value"); repeatable.
        #[arg(short = 'H', long = "header", value_name = "HEADER")]
        headers: Vec<String>,

        /// Do not follow redirects.
        #[arg(long)]
        no_follow: bool,

        /// Maximum transfers active at once (overrides config).
        #[arg(long, value_name = "N")]
        max_concurrent: Option<usize>,

        /// Print response bodies.
        #[arg(long)]
        body: bool,

        /// Print results as a JSON array.
        #[arg(long)]
        json: bool,
    },

    /// Show the config file path and the effective configuration.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch {
                urls,
                timeout_ms,
                method,
                headers,
                no_follow,
                max_concurrent,
                body,
                json,
            } => {
                let args = FetchArgs {
                    urls,
                    timeout_ms,
                    method,
                    headers,
                    follow_redirects: !no_follow,
                    max_concurrent,
                    print_body: body,
                    json,
                };
                run_fetch(&cfg, args).await?;
            }
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}
