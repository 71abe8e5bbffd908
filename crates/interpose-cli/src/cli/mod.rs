//! CLI for the interpose request interception demo.

mod commands;
mod transport;

use anyhow::Result;
use clap::{Parser, Subcommand};
use interpose_core::config::InterposeConfig;

use commands::{run_config, run_simulate};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "interpose")]
#[command(about = "interpose: deferred multi-party request interception demo", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run URLs through a simulated transport with a delayed observer.
    Simulate {
        /// URLs to intercept.
        #[arg(required = true)]
        urls: Vec<String>,
        /// Observer delay in milliseconds (overrides config).
        #[arg(long, value_name = "MS")]
        delay_ms: Option<u64>,
        /// Abort requests whose path ends with this suffix (repeatable; replaces config list).
        #[arg(long = "abort-suffix", value_name = "SUFFIX")]
        abort_suffixes: Vec<String>,
        /// Make every terminal host action fail.
        #[arg(long)]
        fail_actions: bool,
    },

    /// Show the config file path and effective configuration.
    Config,
}

impl Cli {
    /// Dispatch an already parsed command line against the loaded config.
    pub async fn run(self, cfg: Result<InterposeConfig>) -> Result<()> {
        let cfg = cfg?;
        tracing::debug!("loaded config: {:?}", cfg);
        dispatch(self.command, &cfg).await
    }
}

async fn dispatch(command: CliCommand, cfg: &InterposeConfig) -> Result<()> {
    match command {
        CliCommand::Simulate {
            urls,
            delay_ms,
            abort_suffixes,
            fail_actions,
        } => {
            let mut settings = cfg.simulate.clone();
            if let Some(ms) = delay_ms {
                settings.observer_delay_ms = ms;
            }
            if !abort_suffixes.is_empty() {
                settings.abort_suffixes = abort_suffixes;
            }
            settings.fail_actions |= fail_actions;
            run_simulate(&settings, &urls).await?;
        }
        CliCommand::Config => run_config(cfg)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests;
