// API server implementation using actix-web

use crate::api::{middleware, routes};
use crate::config::FeedConfig;
use crate::database_ops::db::Db;
use crate::identity::directory::{AuthDirectory, AuthProvider, FallbackEndpoint};
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use std::env;

/// Per-process state shared by all request handlers. Clients that need a
/// missing credential stay None and the affected endpoints refuse requests.
pub struct AppState {
    pub db: Db,
    pub cfg: FeedConfig,
    pub directory: Option<AuthDirectory>,
    pub fallback: Option<FallbackEndpoint>,
    pub auth: Option<AuthProvider>,
}

impl AppState {
    pub fn build(db: Db, cfg: FeedConfig) -> Result<Self> {
        let directory = match (cfg.supabase_url.as_deref(), cfg.service_role_key.clone()) {
            (Some(url), Some(key)) => {
                Some(AuthDirectory::new(url, key, cfg.identity_timeout_secs)?)
            }
            _ => {
                tracing::warn!(
                    "SUPABASE_URL/SUPABASE_SERVICE_ROLE_KEY not configured; read requests will be refused"
                );
                None
            }
        };

        let auth = match (cfg.supabase_url.as_deref(), cfg.anon_key.clone()) {
            (Some(url), Some(key)) => Some(AuthProvider::new(url, key, cfg.identity_timeout_secs)?),
            _ => {
                tracing::warn!(
                    "SUPABASE_URL/SUPABASE_ANON_KEY not configured; stamp requests will be refused"
                );
                None
            }
        };

        let fallback = match cfg.fallback_identity_url.as_deref() {
            Some(url) => Some(FallbackEndpoint::new(url, cfg.identity_timeout_secs)?),
            None => None,
        };

        Ok(Self {
            db,
            cfg,
            directory,
            fallback,
            auth,
        })
    }
}

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub allowed_origins: String,
}

impl ApiServer {
    /// Create server from environment variables
    pub fn from_env() -> Result<Self> {
        crate::util::env::init_env();

        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("Invalid API_PORT")?;

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://localhost:8000".to_string());

        Ok(Self {
            host,
            port,
            allowed_origins,
        })
    }

    /// Start the HTTP server
    pub async fn run(self, db: Db, cfg: FeedConfig) -> Result<()> {
        let bind_addr = format!("{}:{}", self.host, self.port);

        tracing::info!(
            host = %self.host,
            port = %self.port,
            "Starting caption-feed API server"
        );

        let state = web::Data::new(AppState::build(db, cfg)?);
        let allowed_origins = self.allowed_origins.clone();

        HttpServer::new(move || {
            let (logger, compress) = middleware::setup_middleware();
            let cors = middleware::setup_cors(&allowed_origins);

            App::new()
                .app_data(state.clone())
                .wrap(logger)
                .wrap(compress)
                .wrap(cors)
                .configure(routes::configure_routes)
        })
        .bind(&bind_addr)
        .with_context(|| format!("Failed to bind to {}", bind_addr))?
        .run()
        .await
        .context("HTTP server error")?;

        Ok(())
    }
}
