use chrono::{Duration, Utc};
use clap::Parser;
use coaster_ranker::{
    args::Args,
    database::db::DbClient,
    error::RankingError,
    messaging::{RabbitMqConfig, RabbitMqPublisher},
    runner::{run_ranking, RunOptions},
    utils::cancellation::CancellationToken
};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_level);

    let Some(connection_string) = args.connection_string.as_deref() else {
        error!("CONNECTION_STRING environment variable must be set");
        return ExitCode::FAILURE;
    };

    let cancel = match cancellation_token(args.timeout_minutes) {
        Ok(cancel) => cancel,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(deadline) = cancel.deadline() {
        info!("Run will be cancelled if still computing at {}", deadline);
    }

    let client = match DbClient::connect(connection_string).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            error!("Application cannot start without a valid database connection");
            return ExitCode::FAILURE;
        }
    };

    match client.try_lock_run().await {
        Ok(true) => {}
        Ok(false) => {
            error!("{}", RankingError::AlreadyRunning);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("Failed to acquire the ranking run lock: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling ranking run");
            interrupt.cancel();
        }
    });

    let mut publisher = if args.dry_run { None } else { connect_publisher().await };

    let options = RunOptions {
        dry_run: args.dry_run,
        constants: args.constants()
    };
    let result = run_ranking(&client, publisher.as_ref(), &options, &cancel).await;

    if let Some(publisher) = publisher.as_mut() {
        if let Err(e) = publisher.close().await {
            warn!("Failed to close RabbitMQ connection: {}", e);
        }
    }

    if let Err(e) = client.unlock_run().await {
        warn!("Failed to release the ranking run lock: {}", e);
    }

    match result {
        Ok(report) => {
            if args.json {
                match serde_json::to_string_pretty(&report.outcome.items) {
                    Ok(json) => println!("{}", json),
                    Err(e) => warn!("Failed to serialize results: {}", e)
                }
            }

            info!(
                ranked = report.outcome.leaderboard.len(),
                dry_run = args.dry_run,
                "Ranking run complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Ranking run failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(log_level: &str) {
    let indicatif_layer = IndicatifLayer::new();

    tracing_subscriber::registry()
        .with(EnvFilter::new(log_level))
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(indicatif_layer)
        .init();
}

fn cancellation_token(timeout_minutes: Option<i64>) -> Result<CancellationToken, RankingError> {
    match timeout_minutes {
        None => Ok(CancellationToken::new()),
        Some(minutes) if minutes > 0 => Ok(CancellationToken::with_deadline(
            Utc::now() + Duration::minutes(minutes)
        )),
        Some(minutes) => Err(RankingError::Config(format!(
            "--timeout-minutes must be positive, got {}",
            minutes
        )))
    }
}

/// The broadcast is best-effort, so any problem here only disables it.
async fn connect_publisher() -> Option<RabbitMqPublisher> {
    let config = match RabbitMqConfig::from_env() {
        Ok(config) => config,
        Err(_) => {
            warn!("RabbitMQ credentials not set, ranking updates will not be broadcast");
            return None;
        }
    };

    if !config.enabled {
        info!("RabbitMQ disabled, ranking updates will not be broadcast");
        return None;
    }

    match RabbitMqPublisher::connect_from_config(&config).await {
        Ok(publisher) => Some(publisher),
        Err(e) => {
            warn!("Failed to connect to RabbitMQ, ranking updates will not be broadcast: {}", e);
            None
        }
    }
}
