#![forbid(unsafe_code)]

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use opentelemetry::global;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use userbase::config::Configuration;

const CONFIG_PATH: &str = "CONFIG_PATH";
const DEFAULT_FILTER: &str = "info";

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl+c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT received, shutting down"),
        _ = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}

/// Read configuration with `subscriber` collecting its diagnostics.
///
/// The global subscriber needs the configuration, so it cannot exist yet.
fn read_config<S>(
    path: PathBuf,
    subscriber: S,
) -> Result<Arc<Configuration>, url::ParseError>
where
    S: tracing::Subscriber + Send + Sync + 'static,
{
    tracing::subscriber::with_default(subscriber, || {
        Configuration::default().path(path).read()
    })
}

/// Install the `tracing` subscriber, with OTLP export when configured.
fn init_tracing(config: &Configuration) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter).with(fmt::layer());

    match config.telemetry.otlp_endpoint.as_deref() {
        Some(endpoint) => {
            global::set_tracer_provider(userbase::telemetry::setup_tracer(endpoint)?);
            registry
                .with(userbase::telemetry::setup_logging(endpoint)?)
                .try_init()?;
        },
        None => registry.try_init()?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    // read configuration file. let it in memory.
    let config = read_config(
        std::env::var(CONFIG_PATH).unwrap_or_default().into(),
        fmt()
            .with_env_filter(EnvFilter::new(DEFAULT_FILTER))
            .finish(),
    )?;
    init_tracing(&config)?;

    let (mut state, db) = userbase::initialize_state(config).await?;
    if state.config.telemetry.prometheus {
        state = state.with_metrics(userbase::telemetry::setup_metrics_recorder()?);
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let environment = state.config.environment.clone();
    let app = userbase::app(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, %environment, "server is listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("http server closed");
    db.disconnect().await;

    Ok(())
}
