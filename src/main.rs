use anyhow::Context;
use clap::Parser; // for cli
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use admin_gate::config::{Args, GuardConfig};
use admin_gate::state::AppState;
use admin_gate::sweeper::sweeper;

// this is main async function with tokio
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "admin_gate=info,audit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // parse cli arguments
    let args = Args::parse();
    let config = GuardConfig::from_args(&args).context("invalid configuration")?;

    if config.admin_secret.is_none() {
        error!("ADMIN_SECRET is not set, admin routes will reject every request");
    }

    // creating shared state
    let state = Arc::new(AppState::new(&config));

    // spawn the background sweeper
    tokio::spawn(sweeper(Arc::clone(&state), config.sweep_interval));

    let app = admin_gate::router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(port = args.port, "Gate running");
    info!(admin_prefix = %config.admin_prefix, "Admin routes guarded");
    for tier in &config.policies.tiers {
        info!(
            tier = %tier.name,
            prefix = %tier.prefix,
            limit = tier.policy.limit,
            window_secs = tier.policy.window.num_seconds(),
            "Rate limit tier"
        );
    }
    info!(
        limit = config.policies.global.limit,
        window_secs = config.policies.global.window.num_seconds(),
        "Global rate limit"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
