use sentiment_worker_lib::{
    cli::parse_args,
    config::Config,
    db::build_db_pool,
    logging,
    pipeline::{types::BatchProcessorConfig, HttpSentimentClassifier, PgResultWriter, PipelineService},
    server::setup_server_with_addr,
    state::AppState,
    transport::StdinSource,
};

use diesel::{pg::PgConnection, Connection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use log::{debug, info};
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Gracefully shuts down the worker when a SIGTERM or SIGINT signal is received.
async fn handle_shutdown_signals(state: Arc<AppState>) {
    let mut sigterm =
        signal(SignalKind::terminate()).expect("Failed to register SIGTERM signal handler");
    let mut sigint =
        signal(SignalKind::interrupt()).expect("Failed to register SIGINT signal handler");

    tokio::select! {
        _ = sigterm.recv() => {
            info!("SIGTERM received, shutting down.");
        }
        _ = sigint.recv() => {
            info!("SIGINT received, shutting down.");
        }
    }

    state.shutdown_token.cancel();
}

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

fn run_initial_migrations(
    connection: &mut impl MigrationHarness<diesel::pg::Pg>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    connection.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    let args = parse_args();
    logging::init_logging("sentiment_worker", "info");

    let config = Config::from_env().expect("Config incorrectly specified");
    debug!("Config loaded");

    let mut temp_conn =
        PgConnection::establish(&config.db_url).expect("Could not connect to run migrations");
    run_initial_migrations(&mut temp_conn).expect("Migrations failed");

    let pool = build_db_pool(&config.db_url)
        .await
        .expect("Could not initialize DB pool!");

    let state = Arc::new(AppState::new(pool.clone(), CancellationToken::new()));
    let shutdown_handle = tokio::spawn(handle_shutdown_signals(state.clone()));

    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], args.metrics_port.unwrap_or(3000)));
    let server_handle = setup_server_with_addr(state.clone(), metrics_addr)
        .await
        .expect("Failed to bind health/metrics server");

    let mut processor_config = BatchProcessorConfig::default();
    if let Some(max_batch_size) = args.max_batch_size {
        processor_config.max_batch_size = max_batch_size;
    }

    let classifier = HttpSentimentClassifier::new(
        config.sentiment_api_url.clone(),
        config.language_code.clone(),
        processor_config.classify_timeout,
    )
    .expect("Could not build classifier client");
    let writer = PgResultWriter::new(pool.clone());
    let service = PipelineService::new(classifier, writer, processor_config);

    let mut source = StdinSource::new();
    info!("Consuming survey messages from stdin");
    match service.run(&mut source, state.shutdown_token.clone()).await {
        Ok(summary) => info!(
            "Run complete: {} batches, {} processed, {} failed",
            summary.batches, summary.processed, summary.failed
        ),
        Err(err) => {
            tracing::error!(
                error_report = %logging::format_error_report(&err),
                "message source failed"
            );
            std::process::exit(1);
        }
    }

    state.shutdown_token.cancel();
    shutdown_handle.abort();
    server_handle.await.ok();
}
