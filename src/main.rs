use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use foodgram::{config::Config, db, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    let addr = config.addr()?;

    let pool = db::connect(&config.database_url, config.max_connections)
        .await
        .context("failed to connect to the database")?;
    db::prepare_db(&pool).await.context("failed to prepare schema")?;

    if let Some(email) = &config.admin_email {
        if db::grant_admin(&pool, email).await? {
            tracing::info!(%email, "administrator role granted");
        }
    }

    if let Some(fixture) = &config.ingredients_fixture {
        let loaded = db::load_ingredients(&pool, fixture).await?;
        tracing::info!(loaded, path = %fixture.display(), "ingredient fixture processed");
    }

    tokio::fs::create_dir_all(&config.media_root)
        .await
        .with_context(|| format!("failed to create {}", config.media_root.display()))?;

    let app = routes::generate_routes(AppState::new(pool, config));

    tracing::info!(%addr, "listening");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
    }
    tracing::info!("shutting down");
}
