use std::sync::Arc;

use clap::Parser;

use drift_core::store::{RedisStore, StateStore};
use drift_core::tracker::GitLabClient;
use drift_core::Orchestrator;

use drift_server::auth::AuthConfig;
use drift_server::{AppState, ServerConfig};

fn main() {
    let cfg = ServerConfig::parse();

    let default_level = cfg
        .log_level
        .parse()
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    if let Err(e) = run(cfg) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cfg: ServerConfig) -> anyhow::Result<()> {
    cfg.validate()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.port,
        authentication = cfg.enable_authentication,
        comparison_branch = %cfg.comparison_branch,
        default_drift_threshold = cfg.default_drift_threshold,
        "starting drift guardian"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let store: Arc<dyn StateStore> =
            Arc::new(RedisStore::connect(&cfg.redis_url, RedisStore::DEFAULT_OP_TIMEOUT).await?);
        tracing::info!("connected to redis");

        let tracker = Arc::new(GitLabClient::new(
            &cfg.gitlab_api_url,
            &cfg.gitlab_api_token,
            cfg.gitlab_skip_tls_verify,
        )?);

        let orchestrator = Arc::new(Orchestrator::new(
            store.clone(),
            tracker,
            &cfg.comparison_branch,
            cfg.default_drift_threshold,
        ));

        let auth = if cfg.enable_authentication {
            AuthConfig::bearer(cfg.bearer_token.clone())
        } else {
            AuthConfig::disabled()
        };

        let state = AppState::new(orchestrator, store, auth);

        tokio::select! {
            res = drift_server::serve(cfg.port, state) => res,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                Ok(())
            }
        }
    })
}
