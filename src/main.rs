//! Unibuild CLI - universal source-build orchestrator
//!
//! Entry point for the unibuild command-line application.

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};

use unibuild::cli::output::display_error;
use unibuild::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    cli.output_config().init_tracing();

    // The command future is dropped before a signal arm runs, which kills
    // running tools and removes temporary trees
    let result = tokio::select! {
        result = cli.run() => result,
        code = shutdown_signal() => {
            eprintln!("\nInterrupted");
            std::process::exit(code);
        }
    };

    if let Err(e) = result {
        display_error(&e);
        std::process::exit(1);
    }
}

/// Wait for SIGINT or SIGTERM and return the matching exit status
async fn shutdown_signal() -> i32 {
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        Ok(()) = tokio::signal::ctrl_c() => 130,
        () = terminate => 143,
    }
}
