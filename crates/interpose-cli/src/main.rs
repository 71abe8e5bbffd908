use clap::Parser;
use interpose_core::{config, logging};

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    // Parse first so `--help` and usage errors never create the config file.
    let cli = Cli::parse();

    let cfg = config::load_or_init();
    let filter = cfg.as_ref().ok().and_then(|c| c.log_filter.clone());

    // Initialize logging as early as possible; fall back to stderr if the state dir is unusable.
    if logging::init_logging(filter.as_deref()).is_err() {
        logging::init_logging_stderr(filter.as_deref());
    }

    if let Err(err) = cli.run(cfg).await {
        eprintln!("interpose error: {:#}", err);
        std::process::exit(1);
    }
}
