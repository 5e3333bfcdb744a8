//! Campus Storefront - order and payment service

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campus_storefront::api::{self, AppState};
use campus_storefront::payment::RazorpayGateway;
use campus_storefront::publisher::EventPublisher;
use campus_storefront::repository::{memory::MemoryStore, Repositories};
use campus_storefront::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = AppConfig::from_env()?;

    let repos = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(config.db_max_connections).connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            Repositories::postgres(db)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory collections");
            Repositories::in_memory(MemoryStore::new())
        }
    };

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => { tracing::warn!(error = %e, "NATS unavailable, events will not be published"); None }
        },
        None => None,
    };
    if !config.gateway_configured() { tracing::warn!("Razorpay keys not set, payments will be rejected"); }
    let gateway = Arc::new(RazorpayGateway::new(&config.razorpay_base_url, &config.razorpay_key_id, &config.razorpay_key_secret, &config.razorpay_webhook_secret));

    let port = config.port;
    let state = AppState::new(config, repos, gateway, EventPublisher::new(nats));
    let app = api::router(state);

    tracing::info!("🚀 Campus Storefront listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
