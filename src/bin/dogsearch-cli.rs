//! Demo driver for the dogsearch service.
//!
//! The `search --abort-after-ms` subcommand is the whole point: it drops
//! the HTTP request mid-flight, which should make the server cancel the
//! backend query. Watch the service logs (or `status`) while running it.

use clap::{Parser, Subcommand};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "dogsearch-cli")]
#[command(about = "Demo driver for the dogsearch cancellation service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the dogs table with synthetic rows
    Seed {
        #[arg(long, default_value_t = 50_000)]
        count: u64,
    },
    /// Run a search, optionally aborting it mid-flight
    Search {
        #[arg(long, default_value = "bark")]
        query: String,

        /// Drop the request after this many milliseconds instead of
        /// waiting for the response.
        #[arg(long)]
        abort_after_ms: Option<u64>,
    },
    /// Show pool snapshots and in-flight queries
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Seed { count } => {
            let res = client
                .post(format!("{}/seed?count={}", cli.url, count))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Search {
            query,
            abort_after_ms,
        } => {
            let request = client
                .get(format!("{}/dogs", cli.url))
                .query(&[("search", query.as_str())])
                .send();

            match abort_after_ms {
                None => {
                    let res = request.await?;
                    print_response(res).await?;
                }
                Some(ms) => {
                    tokio::select! {
                        res = request => {
                            println!("Response arrived before the abort deadline:");
                            print_response(res?).await?;
                        }
                        _ = tokio::time::sleep(Duration::from_millis(ms)) => {
                            // Dropping the request future closes the
                            // connection; the server takes it from here.
                            println!(
                                "Request aborted after {ms}ms; the server should now \
                                 cancel the backend query (check its logs or `status`)"
                            );
                        }
                    }
                }
            }
        }
        Commands::Status => {
            let res = client.get(format!("{}/healthz", cli.url)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("{}", text);
        }
        return Ok(());
    }

    let body: serde_json::Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
