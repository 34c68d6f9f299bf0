//! Outbound resilience demo driver.
//!
//! Calls an HTTP endpoint through one of the configured resilient clients.
//!
//! # Architecture Overview
//!
//! ```text
//!     CLI ──▶ ClientRegistry ──▶ ResilientHttpClient
//!                                      │
//!                                      ▼
//!                            ┌──────────────────────┐
//!                            │  ResiliencePipeline  │
//!                            │  ┌────────────────┐  │
//!                            │  │ circuit breaker│  │
//!                            │  │  ┌──────────┐  │  │
//!                            │  │  │  retry   │──┼──┼──▶ downstream
//!                            │  │  └──────────┘  │  │
//!                            │  └────────────────┘  │
//!                            └──────────────────────┘
//!                                      │
//!                     events ──▶ logs (stderr, rolling file), metrics
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use outbound_resilience::config::schema::{HTTP_STATUS, HTTP_STATUS_CIRCUIT_BREAKER};
use outbound_resilience::http::{HttpClientError, ResilientHttpClient};
use outbound_resilience::lifecycle;

#[derive(Parser)]
#[command(name = "outbound-resilience")]
#[command(about = "Call unreliable HTTP endpoints through resilience pipelines", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one request through a retrying client
    Retry {
        #[arg(default_value = "https://httpstat.us/503")]
        url: String,

        #[arg(long, default_value = HTTP_STATUS)]
        client: String,
    },
    /// Send a series of requests through a circuit-breaking client
    CircuitBreaker {
        #[arg(default_value = "https://httpstat.us/500")]
        url: String,

        #[arg(long, default_value = HTTP_STATUS_CIRCUIT_BREAKER)]
        client: String,

        #[arg(long, default_value_t = 20)]
        requests: u32,

        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let started = lifecycle::start(cli.config.as_deref())?;
    let cancellation = started.shutdown.token();

    match cli.command {
        Commands::Retry { url, client } => {
            let client = started.registry.client(&client)?;
            call(client, &url, cancellation).await?;
        }
        Commands::CircuitBreaker {
            url,
            client,
            requests,
            interval_ms,
        } => {
            let client = started.registry.client(&client)?;
            for request in 1..=requests {
                tracing::info!(request, total = requests, "Sending request");
                match call(client, &url, cancellation.clone()).await {
                    Ok(()) => {}
                    Err(HttpClientError::Cancelled) => break,
                    Err(e) if e.is_circuit_open() => {
                        tracing::warn!(error = %e, "Request rejected by open circuit");
                    }
                    Err(e) => tracing::error!(error = %e, "Request failed"),
                }

                tokio::select! {
                    _ = cancellation.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_millis(interval_ms)) => {}
                }
            }
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn call(
    client: &ResilientHttpClient,
    url: &str,
    cancellation: CancellationToken,
) -> Result<(), HttpClientError> {
    let response = match client.get_with_cancellation(url, cancellation).await {
        Ok(response) => response,
        Err(HttpClientError::Cancelled) => {
            tracing::info!("Request cancelled");
            return Err(HttpClientError::Cancelled);
        }
        Err(e) => return Err(e),
    };

    let status = response.status();
    let body = response.text().await.map_err(HttpClientError::Request)?;
    tracing::info!(
        status = status.as_u16(),
        circuit = ?client.circuit_state(),
        "Response received"
    );
    println!("{status}\n{body}");
    Ok(())
}
