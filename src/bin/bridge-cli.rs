use clap::{Parser, Subcommand};
use std::time::Duration;

use event_bridge::control::ControlClient;
use event_bridge::{RequestId, Response};

#[derive(Parser)]
#[command(name = "bridge-cli")]
#[command(about = "Worker and management CLI for the event bridge control API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show bridge status and concurrency
    Status,
    /// Fetch a batch of pending events (poll mode)
    Fetch {
        /// How long to wait for events, in milliseconds
        #[arg(long, default_value_t = 5000)]
        wait_ms: u64,
        /// Maximum events to return
        #[arg(long)]
        max: Option<usize>,
    },
    /// Answer a pending request
    Reply {
        request_id: String,
        #[arg(long, default_value_t = 200)]
        status: u16,
        #[arg(long, default_value = "")]
        body: String,
        /// Response header as `name:value`; repeatable
        #[arg(long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },
    /// Answer every event by echoing it back until interrupted
    Echo {
        #[arg(long, default_value_t = 5000)]
        wait_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = ControlClient::new(cli.url);

    match cli.command {
        Commands::Status => {
            let status = client.status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Fetch { wait_ms, max } => {
            let events = client
                .fetch_events(Some(Duration::from_millis(wait_ms)), max)
                .await?;
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
        Commands::Reply {
            request_id,
            status,
            body,
            headers,
        } => {
            let mut response = Response::new(RequestId::from(request_id), status).body(body);
            for (name, value) in headers {
                response = response.header(&name, value);
            }
            client.submit(&response).await?;
            println!("delivered");
        }
        Commands::Echo { wait_ms } => loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                batch = client.fetch_events(Some(Duration::from_millis(wait_ms)), None) => {
                    for event in batch? {
                        let mut response = Response::new(event.request_id.clone(), 200).body(event.body);
                        response.headers = event.headers;
                        if let Err(err) = client.submit(&response).await {
                            eprintln!("Error: {} ({})", err, event.request_id);
                        }
                    }
                }
            }
        },
    }

    Ok(())
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    raw.split_once(':')
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .ok_or_else(|| format!("expected name:value, got '{}'", raw))
}
