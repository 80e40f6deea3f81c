use std::sync::Arc;

use clap::Parser;
use folio_core::store::ContentStore;
use folio_core::{EmbeddingBackend, FolioConfig, GeminiEmbeddingClient};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use folio_server::http::{start_http_server, HttpState};
use folio_server::store_pg::PgContentStore;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "folio.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Init logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    // Load config
    let config = match FolioConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Connect to DB
    let pool = match folio_core::db::create_pool(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match folio_core::db::health_check(&pool).await {
            Ok(v) => println!("✅ PostgreSQL connected: {}", v),
            Err(e) => {
                println!("❌ PostgreSQL connection failed: {}", e);
                std::process::exit(1);
            }
        }

        match folio_core::db::check_pgvector(&pool).await {
            Ok(Some(v)) => println!("✅ pgvector version: {}", v),
            Ok(None) => {
                println!("❌ pgvector extension is not installed");
                std::process::exit(1);
            }
            Err(e) => {
                println!("❌ pgvector check failed: {}", e);
                std::process::exit(1);
            }
        }

        println!("✅ Folio DB health check passed");
        return Ok(());
    }

    // Embedding backend (API key from GOOGLE_API_KEY)
    let backend: Arc<dyn EmbeddingBackend> =
        match GeminiEmbeddingClient::new(None, config.embedding.clone()) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                eprintln!("Failed to create embedding client: {}", e);
                std::process::exit(1);
            }
        };

    let store: Arc<dyn ContentStore> = Arc::new(PgContentStore::new(pool.clone()));

    // Shutdown signal
    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let state = HttpState {
        pool,
        store,
        backend,
        config,
    };

    start_http_server(state, tx.subscribe()).await?;

    Ok(())
}
