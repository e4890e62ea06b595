use clap::Parser;
use sdrpipe::cli::{self, Cli};
use tracing::{error, info_span};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { -1 } else { 0 });
        }
    };

    // stdout carries samples, so diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let span = info_span!("stage", command = %cli.command.name());
    let _enter = span.enter();

    if let Err(e) = cli::run(cli) {
        error!("{:#}", e);
        std::process::exit(cli::exit_code(&e));
    }
}
