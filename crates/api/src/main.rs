use anyhow::Context;

use campus_managers::{Config, ManagersLoader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    campus_observability::init();

    let config = Config::from_env().context("invalid configuration")?;
    let port = config.user_port;
    let managers = ManagersLoader::new(config)
        .and_then(ManagersLoader::load)
        .context("failed to load managers")?;

    let app = campus_api::app::build_app(&managers);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind 0.0.0.0:{port}"))?;

    tracing::info!(
        service = %managers.config.service_name,
        addr = %listener.local_addr()?,
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
