//! Syncport CLI
//!
//! Runs a syncport connector.
//!
//! # Commands
//!
//! - `serve` - Serve the JSON-RPC endpoint over HTTP
//! - `call` - Run one JSON-RPC call in-process and print the response
//! - `check` - Test the connection to the destination
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use syncport_destination::BackendKind;
use tracing_subscriber::EnvFilter;

/// Syncport connector runner.
#[derive(Parser, Debug)]
#[command(name = "syncport")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Destination backend (memory, rest, postgres)
    #[arg(global = true, short, long, env = "SYNCPORT_BACKEND", default_value = "memory")]
    backend: BackendKind,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the connector over HTTP
    Serve {
        /// Address to bind to (overrides SYNCPORT_BIND)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Run one JSON-RPC call in-process
    Call {
        /// Method name, e.g. list_objects
        method: String,

        /// Params as a JSON document
        params: Option<String>,
    },

    /// Test the connection to the destination
    Check,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { bind } => commands::serve::run(cli.backend, bind).await?,
        Commands::Call { method, params } => {
            commands::call::run(cli.backend, &method, params.as_deref()).await?
        }
        Commands::Check => commands::check::run(cli.backend).await?,
        Commands::Version => {
            println!("syncport v{}", env!("CARGO_PKG_VERSION"));
            println!("backends: memory, rest, postgres");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["syncport", "serve", "--backend", "postgres", "--bind", "0.0.0.0:7000"])
            .unwrap();
        assert_eq!(cli.backend, BackendKind::Postgres);
        match cli.command {
            Commands::Serve { bind } => assert_eq!(bind.unwrap().port(), 7000),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parse_call_with_params() {
        let cli = Cli::try_parse_from([
            "syncport",
            "-b",
            "crm",
            "call",
            "list_fields",
            r#"{"object": {"object_api_name": "user", "label": "Users"}}"#,
        ])
        .unwrap();
        assert_eq!(cli.backend, BackendKind::Rest);
        match cli.command {
            Commands::Call { method, params } => {
                assert_eq!(method, "list_fields");
                assert!(params.unwrap().contains("object_api_name"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn reject_unknown_backend() {
        assert!(Cli::try_parse_from(["syncport", "--backend", "mysql", "check"]).is_err());
    }
}
