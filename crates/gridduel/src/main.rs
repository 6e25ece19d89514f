//! The `gridduel` coordinator binary.
//!
//! Configured entirely through `GRIDDUEL_*` environment variables; log
//! filtering follows `RUST_LOG` (default `info`).

use std::sync::Arc;

use gridduel::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), GridduelError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = GridduelConfig::from_env()?;

    let mut auth = JwtAuthenticator::new(config.jwt_secret.as_bytes());
    if let Some(issuer) = &config.jwt_issuer {
        auth = auth.with_issuer(issuer);
    }
    let rules = Arc::new(HttpRulesService::new(config.rules.clone())?);

    let server = GridduelServerBuilder::from_config(&config)
        .build(auth, rules)
        .await?;

    if let Ok(addr) = server.local_addr() {
        tracing::info!(%addr, rules = %config.rules.base_url, "gridduel listening");
    }
    server.run().await
}
