/// Bloodlink server binary
use anyhow::Context;
use bloodlink::{config::ServerConfig, context::AppContext, server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("failed to load configuration")?;

    init_tracing(&config);

    config.validate().context("invalid configuration")?;

    let ctx = AppContext::new(config)
        .await
        .context("failed to initialise application")?;

    if let Some(admin) = ctx.config.bootstrap.clone() {
        ctx.account_manager
            .ensure_admin(&admin)
            .await
            .context("failed to bootstrap administrator")?;
    }

    let db = ctx.db.clone();
    let result = server::serve(ctx).await;
    db.close().await;

    result.context("server terminated with an error")
}

fn init_tracing(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("bloodlink={0},tower_http={0}", config.logging.level))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
