use anyhow::Context;

use quorumtoken_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("loading configuration")?;
    quorumtoken_observability::init(config.log_format);

    let app = quorumtoken_api::app::build_app_from_config(&config)
        .context("opening wallet")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        wallet_id = %config.wallet_id,
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
