// HTTP API server binary for caption-feed
// Serves the public caption feed, search, and uploader stamping endpoints

use anyhow::Result;
use caption_feed::api::ApiServer;
use caption_feed::config::FeedConfig;
use caption_feed::database_ops::db::Db;
use caption_feed::util::env as env_util;

#[actix_web::main]
async fn main() -> Result<()> {
    // Initialize logging
    caption_feed::tracing::init_tracing("info,sqlx=warn")?;

    tracing::info!("Initializing caption-feed API server");

    // Load dotenv/env once (safe to call multiple times)
    env_util::init_env();

    // Load configuration from environment
    let server = ApiServer::from_env()?;
    let cfg = FeedConfig::from_env();

    // Initialize database connection
    let database_url = env_util::db_url()?;
    let max_connections: u32 = env_util::env_parse("DB_MAX_CONNS", 10u32);
    let db = Db::connect(&database_url, max_connections).await?;

    tracing::info!("Database connected successfully");

    // Start HTTP server
    server.run(db, cfg).await?;

    Ok(())
}
