use clap::Parser;
use notewise_core::NotewiseConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use notewise_server::http::{self, HttpState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "notewise.toml")]
    config: String,

    /// Check database connectivity and exit
    #[arg(long)]
    health: bool,

    /// Keep notes and history in memory instead of PostgreSQL (lost on exit)
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (GOOGLE_API_KEY lives there in development)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match NotewiseConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG wins over [service] log_level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    let pool = if args.in_memory {
        tracing::warn!("Running with the in-memory store; data is lost on exit");
        None
    } else {
        match notewise_core::db::connect(&config.database).await {
            Ok(p) => Some(p),
            Err(e) => {
                eprintln!("Failed to connect to database: {}", e);
                std::process::exit(1);
            }
        }
    };

    if args.health {
        let (status, body) = http::health_inner(pool.as_ref()).await;
        if status.is_success() {
            println!("✅ Storage: {}", body["storage"].as_str().unwrap_or("?"));
            if let Some(v) = body["postgresql"].as_str() {
                println!("✅ PostgreSQL connected: {}", v);
            }
            println!("✅ Notewise health check passed");
            return Ok(());
        }
        println!(
            "❌ Health check failed: {}",
            body["error"].as_str().unwrap_or("unknown error")
        );
        std::process::exit(1);
    }

    let state = HttpState::from_config(&config, pool.clone())?;

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let result = http::start_http_server(state, &config.http, tx.subscribe()).await;

    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("Database pool closed");
    }

    result
}
