use std::{process, sync::Arc};

use lyrics_library::{
    application::{
        error::AppError,
        tracks::TrackService,
        warmup::{WarmupConfig, spawn_cache_warmer},
    },
    cache::{CacheConfig, MemoryTrackCache},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        lyrics::LyricsOvhClient,
        telemetry,
        translator::YandexTranslator,
    },
};
use sqlx::PgPool;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
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

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = Arc::new(PostgresRepositories::new(init_pool(&settings).await?));

    let cache = Arc::new(MemoryTrackCache::new(&CacheConfig::from(&settings.cache)));
    let provider = Arc::new(LyricsOvhClient::new(&settings.lyrics)?);
    let translator = Arc::new(YandexTranslator::new(&settings.translator)?);
    let (warm_queue, warm_worker) =
        spawn_cache_warmer(&WarmupConfig::from(&settings.warmup), cache.clone());

    let tracks = Arc::new(TrackService::new(
        provider,
        translator,
        repositories.clone(),
        cache,
        warm_queue,
    ));

    let result = serve_http(&settings, HttpState { tracks }).await;

    let report = warm_worker.shutdown(settings.server.graceful_shutdown).await;
    if report.abandoned > 0 {
        warn!(
            completed = report.completed,
            failed = report.failed,
            abandoned = report.abandoned,
            "cache warm queue did not drain before the shutdown deadline"
        );
    } else {
        info!(
            completed = report.completed,
            failed = report.failed,
            "cache warm queue drained"
        );
    }

    repositories.close().await;
    result
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let pool = init_pool(&settings).await?;
    info!("database migrations applied");
    pool.close().await;
    Ok(())
}

async fn init_pool(settings: &config::Settings) -> Result<PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(pool)
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state, settings.server.request_timeout);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(addr = %settings.server.addr, "http server listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!("http server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!("shutdown signal received");
}
