use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod argocd;
mod config;
mod error;
mod reconciler;
mod store;
mod team;

use crate::store::kube::KubeArgoStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("TEAM_OPERATOR_LOG").unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().json())
        .init();

    let cfg = config::Config::load();

    let client = kube::Client::try_default().await?;
    tracing::info!("kubernetes client created");

    let ctx = Arc::new(reconciler::Context {
        store: Arc::new(KubeArgoStore::new(client.clone())),
        config: cfg,
    });

    tracing::info!(namespace = %ctx.config.argocd_namespace, "starting team operator");
    reconciler::run(client, ctx).await;

    tracing::info!("team operator stopped");
    Ok(())
}
