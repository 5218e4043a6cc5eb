use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use dustline_airquality::{Air4ThaiClient, StationProvider};
use dustline_assessment::Assessment;
use dustline_broadcast::BroadcastService;
use dustline_channels::LineClient;
use dustline_config::Config;
use dustline_gateway::{start_server, AppState};
use dustline_routing::MessageRouter;
use dustline_scheduler::BroadcastScheduler;
use dustline_session::{SessionStore, UserLocks};

#[derive(Parser)]
#[command(name = "dustline")]
#[command(about = "Dustline — PM2.5 health consultation LINE chatbot")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server and broadcast scheduler
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Send one PM2.5 report broadcast and exit
    Broadcast,
    /// Print a PM2.5 report for a named station or the Bangkok average
    Dust {
        /// Station or area name to search for
        #[arg(short, long)]
        location: Option<String>,
    },
    /// Show the health status of a running instance
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    dustline_logging::init_logger(&config.log_level, config.log_dir.as_deref());

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { port } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                ..config
            };
            run_server(config).await?;
        }
        Commands::Broadcast => {
            config.validate()?;
            let broadcast = build_broadcast(&config);
            if !broadcast.run().await {
                anyhow::bail!("broadcast failed");
            }
        }
        Commands::Dust { location } => {
            let client = Air4ThaiClient::new(&config.air4thai_url);
            println!("{}", client.dust_report(location.as_deref()).await);
        }
        Commands::Status => {
            let client = reqwest::Client::new();
            match client
                .get(format!("http://localhost:{}/", config.port))
                .send()
                .await
            {
                Ok(resp) => {
                    let body: serde_json::Value = resp.json().await?;
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(_) => {
                    println!("Dustline is not running on port {}", config.port);
                }
            }
        }
    }

    Ok(())
}

fn build_broadcast(config: &Config) -> Arc<BroadcastService> {
    let stations: Arc<dyn StationProvider> =
        Arc::new(Air4ThaiClient::new(&config.air4thai_url));
    let line = Arc::new(LineClient::new(&config.line_channel_access_token));
    Arc::new(BroadcastService::new(
        &config.pm25_image_page,
        line,
        stations,
    ))
}

async fn run_server(config: Config) -> Result<()> {
    config.validate()?;
    info!(
        port = config.port,
        bind = %config.bind_address,
        state_file = %config.state_file,
        "Starting Dustline"
    );

    let store = Arc::new(SessionStore::open(&config.state_file));
    let stations: Arc<dyn StationProvider> =
        Arc::new(Air4ThaiClient::new(&config.air4thai_url));
    let assessment = Arc::new(Assessment::new(Arc::clone(&store)));
    let router = Arc::new(MessageRouter::new(
        Arc::clone(&store),
        assessment,
        Arc::clone(&stations),
    ));
    let line = Arc::new(LineClient::new(&config.line_channel_access_token));
    let broadcast = Arc::new(BroadcastService::new(
        &config.pm25_image_page,
        Arc::clone(&line),
        Arc::clone(&stations),
    ));

    let scheduler = BroadcastScheduler::new(
        &config.broadcast_times,
        &config.broadcast_timezone,
        Arc::clone(&broadcast),
    )?;
    tokio::spawn(async move {
        scheduler.run().await;
    });

    let state = AppState {
        channel_secret: config.line_channel_secret.clone(),
        router,
        locks: Arc::new(UserLocks::new()),
        line,
        broadcast,
    };

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .context("invalid bind address")?;
    start_server(addr, state).await
}
