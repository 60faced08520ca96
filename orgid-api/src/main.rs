//! orgid-api - Institution matching microservice
//!
//! Turns text strings describing academic institutions into registry and
//! bibliographic ids, and scores the matcher against labeled test sets.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use orgid_common::config::{ConfigOverrides, OrgIdConfig};
use orgid_common::evaluation::HttpTestSource;
use orgid_common::geo::{Gazetteer, GeoExtractor};
use orgid_common::{InstitutionService, RegistrySource};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orgid_api::{build_router, AppState};

/// Command-line arguments for orgid-api
#[derive(Parser, Debug)]
#[command(name = "orgid-api")]
#[command(about = "Institution name matching service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "ORGID_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "ORGID_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "ORGID_PORT")]
    port: Option<u16>,

    /// Flattened registry CSV
    #[arg(short, long, env = "ORGID_REGISTRY_PATH")]
    registry: Option<PathBuf>,

    /// URL of the labeled test sheet (CSV)
    #[arg(long, env = "ORGID_TEST_DATA_URL")]
    test_data_url: Option<String>,

    /// API key sent when fetching test data
    #[arg(long, env = "ORGID_OPENALEX_API_KEY", hide_env_values = true)]
    openalex_api_key: Option<String>,

    /// Extra gazetteer entries (name,kind,country CSV)
    #[arg(long, env = "ORGID_GAZETTEER_PATH")]
    gazetteer: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "ORGID_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            registry_path: self.registry.clone(),
            test_data_url: self.test_data_url.clone(),
            openalex_api_key: self.openalex_api_key.clone(),
            gazetteer_path: self.gazetteer.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = OrgIdConfig::load(args.config.as_deref())
        .and_then(|config| config.apply(args.overrides()))
        .context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "orgid_api={0},orgid_common={0},tower_http=info",
                    config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting orgID API (orgid-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let geo: Arc<dyn GeoExtractor> = match &config.gazetteer_path {
        Some(path) => match Gazetteer::with_file(path) {
            Ok(gazetteer) => Arc::new(gazetteer),
            Err(e) => {
                warn!("Failed to load gazetteer {}: {}; using built-in places", path.display(), e);
                Arc::new(Gazetteer::builtin()?)
            }
        },
        None => Arc::new(Gazetteer::builtin()?),
    };

    let registry_path = config.resolved_registry_path();
    info!("Registry: {}", registry_path.display());
    let institutions = Arc::new(InstitutionService::new(
        RegistrySource::Csv(registry_path),
        geo,
    ));

    // Build the index before accepting requests
    let index = institutions.ensure_loaded().await;
    info!("✓ Index ready ({} institutions)", index.len());

    let test_source = Arc::new(HttpTestSource::new(
        config.test_data_url.clone(),
        config.openalex_api_key.as_deref(),
    )?);

    let state = AppState::new(institutions, test_source);
    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("orgid-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
