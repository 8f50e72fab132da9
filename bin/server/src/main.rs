//! Webhook server for the inboxflow automation engine.

mod config;
mod db;
mod routes;
mod state;
mod tenant;

use crate::config::ServerConfig;
use crate::db::PgStore;
use crate::state::AppState;
use crate::tenant::TenantResolver;
use inboxflow_ai::{OpenAiBackend, OpenAiConfig};
use inboxflow_channel::{
    ChannelRouter, InstagramConfig, InstagramSender, WhatsAppConfig, WhatsAppSender,
};
use inboxflow_workflow::{Engine, ExecutorConfig};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    let http = reqwest::Client::new();

    let mut channels = ChannelRouter::new();
    if let Some(whatsapp) = &config.whatsapp {
        channels = channels.with_whatsapp(Arc::new(WhatsAppSender::new(
            WhatsAppConfig {
                base_url: whatsapp.base_url.clone(),
                phone_number_id: whatsapp.phone_number_id.clone(),
                access_token: whatsapp.access_token.clone(),
            },
            http.clone(),
        )));
        tracing::info!("WhatsApp sending configured");
    }
    if let Some(instagram) = &config.instagram {
        channels = channels.with_instagram(Arc::new(InstagramSender::new(
            InstagramConfig {
                base_url: instagram.base_url.clone(),
                access_token: instagram.access_token.clone(),
            },
            http.clone(),
        )));
        tracing::info!("Instagram sending configured");
    }

    let reply_backend = Arc::new(OpenAiBackend::new(
        OpenAiConfig {
            base_url: config.openai.base_url.clone(),
            model: config.openai.model.clone(),
            api_key: config.openai.api_key.clone(),
        },
        http,
    ));

    let store = Arc::new(PgStore::new(db_pool.clone()));
    let engine = Arc::new(Engine::new(store, reply_backend, channels).with_executor_config(
        ExecutorConfig {
            max_steps: config.engine.max_steps,
            node_timeout: Duration::from_secs(config.engine.node_timeout_seconds),
        },
    ));

    let app = routes::router(AppState {
        engine,
        resolver: TenantResolver::new(db_pool.clone()),
        pool: db_pool,
    });

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind listen address");
    tracing::info!(addr = %config.listen_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    tracing::info!("shutting down");
}
