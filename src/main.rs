use std::process;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

use kura::application::provider::Provider;
use kura::application::service::FetchCache;
use kura::application::store::CacheStore;
use kura::cache::FreshnessWindows;
use kura::config;
use kura::infra::db::PostgresStore;
use kura::infra::error::InfraError;
use kura::infra::http::{self, HttpState};
use kura::infra::memory::MemoryStore;
use kura::infra::telemetry;
use kura::infra::upstream::ScraperClient;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &InfraError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), InfraError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| InfraError::configuration(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    let config::Command::Serve(_) = command;
    run_serve(settings).await
}

async fn run_serve(settings: config::Settings) -> Result<(), InfraError> {
    let store = init_store(&settings).await?;
    let client = ScraperClient::new(&settings.upstream).map_err(|err| {
        InfraError::configuration(format!("failed to build upstream client: {err}"))
    })?;
    let provider: Arc<dyn Provider> = Arc::new(client);

    let service = Arc::new(FetchCache::new(
        store.clone(),
        provider,
        FreshnessWindows::from(&settings.freshness),
    ));

    let router = http::build_router(HttpState { service, store });

    let listener = TcpListener::bind(settings.server.bind_addr)
        .await
        .map_err(InfraError::from)?;
    info!(
        target = "kura::server",
        addr = %settings.server.bind_addr,
        upstream = %settings.upstream.base_url,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
        .await
        .map_err(InfraError::from)?;

    Ok(())
}

async fn init_store(settings: &config::Settings) -> Result<Arc<dyn CacheStore>, InfraError> {
    match settings.database.url.as_deref() {
        Some(url) => {
            let pool = PostgresStore::connect(url, settings.database.max_connections.get())
                .await
                .map_err(|err| InfraError::database(err.to_string()))?;
            PostgresStore::run_migrations(&pool)
                .await
                .map_err(|err| InfraError::database(err.to_string()))?;
            info!(target = "kura::server", "connected to postgres store");
            Ok(Arc::new(PostgresStore::new(pool)))
        }
        None => {
            warn!(
                target = "kura::server",
                "database url is not configured, falling back to the in-process store"
            );
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn shutdown_signal(grace: Duration) {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(error = %error, "failed to install interrupt handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                error!(error = %error, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!(target = "kura::server", "shutdown signal received, draining requests");

    // Connections still in flight get the grace period before the process is
    // forced out.
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(
            target = "kura::server",
            grace_secs = grace.as_secs(),
            "drain deadline passed, forcing exit"
        );
        process::exit(0);
    });
}
