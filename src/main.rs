use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gpgmail::cli;
use gpgmail::config::Manifest;
use gpgmail::error::exit_code_for;
use gpgmail::ui::display;

#[tokio::main]
async fn main() {
    let args = cli::Cli::parse();

    let log_level = if args.verbose {
        "debug"
    } else if args.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    if let Err(err) = run(args).await {
        display::error(&format!("{:#}", err));
        std::process::exit(exit_code_for(&err));
    }
}

async fn run(args: cli::Cli) -> Result<()> {
    let manifest = Manifest::load(args.config.as_deref())?;

    match args.command {
        cli::Command::Send(send) => cli::send::run(send, &manifest, args.quiet).await,
        cli::Command::Keys(keys) => cli::keys::run(keys, &manifest),
        cli::Command::Completions { shell } => {
            let mut cmd = <cli::Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "gpgmail", &mut std::io::stdout());
            Ok(())
        }
    }
}
