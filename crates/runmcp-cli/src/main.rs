use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod report;

use cli::args::Cli;
use cli::commands::dispatch;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so --json output on stdout stays machine-readable.
    let default_level = if cli.verbose {
        "debug"
    } else if cli.json || cli.tui {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fatal: {e:#}");
            1
        }
    };
    std::process::exit(code);
}
