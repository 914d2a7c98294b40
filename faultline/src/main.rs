use clap::Parser;
use reqwest::Method;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use faultline_core::config::Config;
use faultline_core::error_log::{self, ErrorLog};
use faultline_core::handler::ErrorHandler;
use faultline_core::server::ApiServer;
use faultline_core::{logging, ApiClient, FaultlineError, FaultlineResult, RequestOptions};

mod routes;

#[derive(Parser)]
#[command(name = "faultline")]
#[command(about = "Console failure handling: demo API and request probe", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Serve the demo console API
    Serve {
        /// Bind address (e.g., 127.0.0.1:3000)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Issue one request and print the result envelope as JSON
    Probe {
        /// Request path, joined to the base URL
        path: String,

        #[arg(long, default_value = "GET")]
        method: String,

        /// JSON request body
        #[arg(long)]
        data: Option<String>,

        /// Bearer token
        #[arg(long)]
        token: Option<String>,

        /// Overrides the configured base URL
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Show errors held by the durable mirror
    Errors {
        /// Empty the log afterwards
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() -> FaultlineResult<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    logging::init(&config.logging)?;
    let log = error_log::init_global(config.build_error_log())?;

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind_address.clone());
            info!(environment = ?config.environment, "Starting demo console API");
            let router = routes::router(routes::AppState::default());
            ApiServer::new(bind, router).serve().await
        }
        Commands::Probe {
            path,
            method,
            data,
            token,
            base_url,
        } => {
            let mut client_config = config.client_config();
            if base_url.is_some() {
                client_config.base_url = base_url;
            }
            let client = ApiClient::new(client_config)?;
            if let Some(token) = token {
                client.set_auth_token(&token)?;
            }

            let method = Method::from_bytes(method.to_uppercase().as_bytes())
                .map_err(|e| FaultlineError::configuration("probe.method", e.to_string()))?;
            let mut options = RequestOptions::new(method);
            if let Some(data) = data {
                let body: Value = serde_json::from_str(&data)?;
                options = options.json(&body)?;
            }

            let envelope = client.request_envelope::<Value>(&path, options).await;
            println!("{}", serde_json::to_string_pretty(&envelope)?);

            if let Some(error) = envelope.error() {
                let handler = ErrorHandler::api_errors().with_log(Arc::clone(&log));
                if let Some(error_id) = handler.handle_error(error.clone(), None) {
                    eprintln!("Error ID: {}", error_id);
                }
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Errors { clear } => {
            print_mirrored(&log)?;
            if clear {
                log.clear_errors();
            }
            Ok(())
        }
    }
}

fn print_mirrored(log: &ErrorLog) -> FaultlineResult<()> {
    let records = log.mirrored_errors();
    if records.is_empty() {
        println!("No errors recorded");
        return Ok(());
    }

    for record in records {
        println!("{}", serde_json::to_string(&record)?);
    }
    Ok(())
}
