use anyhow::{Context, Result};
use pdfstitch_api::{app, ApiConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdfstitch=info,pdfstitch_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ApiConfig::from_env()?;
    let bind = config.bind;
    info!(
        templates = %config.template_dir.display(),
        output = %config.output_dir.display(),
        "loaded configuration"
    );

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!("pdfstitch API listening on http://{bind}");

    axum::serve(listener, app(config)).await.context("server error")?;
    Ok(())
}
