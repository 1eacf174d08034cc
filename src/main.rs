use std::{process, sync::Arc};

use memeforge::{
    application::{
        error::AppError,
        render::{Compositor, FontResolver},
        worker::WorkerContext,
    },
    config,
    infra::{
        db::PostgresStatusStore, error::InfraError, fetch::HttpTemplateSource,
        queue::QueueConsumer, storage::S3ArtifactStore, telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
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
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let ctx = build_worker_context(&settings).await?;
    let consumer = QueueConsumer::new(settings.broker.clone());

    info!(
        queue = %settings.broker.queue,
        "memeforge worker starting"
    );

    tokio::select! {
        _ = consumer.run(ctx) => Ok(()),
        result = tokio::signal::ctrl_c() => {
            result.map_err(|err| AppError::from(InfraError::Io(err)))?;
            info!("shutdown signal received, stopping worker");
            Ok(())
        }
    }
}

async fn build_worker_context(settings: &config::Settings) -> Result<WorkerContext, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let status_store =
        PostgresStatusStore::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    let template_source = HttpTemplateSource::new(settings.fetcher.timeout)
        .map_err(|err| AppError::unexpected(format!("failed to build http client: {err}")))?;

    let artifact_store = S3ArtifactStore::new(&settings.storage);

    let compositor = Compositor::new(FontResolver::new(settings.render.font_paths.clone()));

    Ok(WorkerContext {
        status: Arc::new(status_store),
        templates: Arc::new(template_source),
        artifacts: Arc::new(artifact_store),
        compositor: Arc::new(compositor),
    })
}
