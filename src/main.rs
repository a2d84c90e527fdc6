#![forbid(unsafe_code)]

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use wxo_lifecycle::cli::{Cli, Commands};
use wxo_lifecycle::commands;
use wxo_lifecycle::error::Result;
use wxo_lifecycle::plan::Action;
use wxo_lifecycle::runner::CancelFlag;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("⚠ Warning: failed to initialize logging: {}", e);
    }

    let cancel = CancelFlag::new();
    install_interrupt_handler(&cancel);

    match run(&cli, cancel) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Debug logging for this crate with `-v`; otherwise only what RUST_LOG asks for
fn init_logging(verbose: bool) -> anyhow::Result<()> {
    if verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("wxo_lifecycle=debug".parse()?),
            )
            .with_writer(std::io::stderr)
            .init();
    } else if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

/// First Ctrl-C stops the run after killing the command in flight
fn install_interrupt_handler(cancel: &CancelFlag) {
    let flag = cancel.clone();
    let installed = ctrlc::set_handler(move || {
        if !flag.is_cancelled() {
            eprintln!("\n⚠ Interrupted, stopping the run...");
        }
        flag.cancel();
    });

    if let Err(e) = installed {
        tracing::warn!(error = %e, "could not install interrupt handler");
    }
}

fn run(cli: &Cli, cancel: CancelFlag) -> Result<u8> {
    match &cli.command {
        Commands::Apply(cmd) => {
            commands::lifecycle::execute(cmd, Action::Import, cli.verbose, cancel)
        }
        Commands::Teardown(cmd) => {
            commands::lifecycle::execute(cmd, Action::Remove, cli.verbose, cancel)
        }
        Commands::Plan(cmd) => commands::plan::execute(cmd, cli.verbose).map(|_| 0),
        Commands::Validate { manifest } => commands::validate::execute(manifest).map(|_| 0),
        Commands::Config { command } => commands::config::execute(command).map(|_| 0),
    }
}
