mod app_env;
mod config;
mod error;
mod http;

use anyhow::Context;
use app_env::AppEnv;
use clap::Parser;
use flapjack_dispatch::{Dispatcher, ExponentialBackoff, LoggingDeliverer, Renderer};
use flapjack_maintenance::MaintenanceManager;
use flapjack_models::MediumType;
use flapjack_processor::{CheckProcessor, EventReceiver};
use flapjack_router::RouteResolver;
use flapjack_store::Store;
use std::path::PathBuf;
use std::sync::Arc;

/// Runs the Flapjack daemon: ingests events, drives the failure/recovery
/// state machine, resolves routes, and dispatches alerts, alongside an
/// admin HTTP surface for operators.
#[derive(Debug, Parser)]
struct Args {
    /// Directory containing base.yaml and per-environment overrides.
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let app_env = AppEnv::from_environment()?;
    init_tracing(app_env);

    let settings = config::load_settings(&args.config_dir, app_env)
        .context("loading configuration")?;

    tracing::info!(?app_env, "starting flapjackd");

    let pool = connect(&settings.database).await?;
    let store = Store::new(pool);
    store.run_migrations().await.context("running migrations")?;

    let maintenance = MaintenanceManager::new(store.clone());
    let router = RouteResolver::new(store.clone());
    let processor = CheckProcessor::new(store.clone(), maintenance.clone(), router.clone());
    let receiver = Arc::new(EventReceiver::new(store.clone()));

    let renderer = Renderer::try_new().context("registering notification templates")?;
    let retry = ExponentialBackoff::new(
        settings.notifier.max_attempts,
        settings.notifier.min_backoff,
        settings.notifier.max_backoff,
    );
    let default_gateway_timeout = std::time::Duration::from_secs(30);
    let mut dispatcher = Dispatcher::new(store.clone(), renderer, retry);
    for medium_type in [
        MediumType::Email,
        MediumType::Sms,
        MediumType::SmsNexmo,
        MediumType::Sns,
        MediumType::Pagerduty,
        MediumType::Jabber,
        MediumType::Slack,
    ] {
        let timeout = settings
            .gateways
            .get(&medium_type)
            .map(|g| g.timeout)
            .unwrap_or(default_gateway_timeout);
        dispatcher.register(medium_type, Arc::new(LoggingDeliverer), timeout);
    }
    let dispatcher = Arc::new(dispatcher);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let mut tasks = tokio::task::JoinSet::new();

    {
        let processor = processor;
        let poll_interval = settings.processor.poll_interval;
        let batch_size = settings.processor.batch_size;
        let shutdown_rx = shutdown_rx.clone();
        tasks.spawn(async move {
            processor.run(poll_interval, batch_size, shutdown_rx).await;
        });
    }

    {
        let store = store.clone();
        let router = router.clone();
        let poll_interval = settings.processor.notification_poll_interval;
        let shutdown_rx = shutdown_rx.clone();
        tasks.spawn(run_notification_router(store, router, poll_interval, shutdown_rx));
    }

    for medium_type in [
        MediumType::Email,
        MediumType::Sms,
        MediumType::SmsNexmo,
        MediumType::Sns,
        MediumType::Pagerduty,
        MediumType::Jabber,
        MediumType::Slack,
    ] {
        let dispatcher = dispatcher.clone();
        let concurrency = settings.notifier.concurrency_per_medium;
        let poll_interval = settings.notifier.poll_interval;
        let heartbeat_timeout = settings.notifier.heartbeat_timeout;
        let shutdown_rx = shutdown_rx.clone();
        tasks.spawn(async move {
            dispatcher
                .run_medium(medium_type, concurrency, poll_interval, heartbeat_timeout, shutdown_rx)
                .await;
        });
    }

    let app_state = http::AppState {
        store: store.clone(),
        receiver,
        maintenance,
    };
    let app = http::router(app_state);
    let listener = tokio::net::TcpListener::bind(settings.http.address())
        .await
        .context("binding admin HTTP listener")?;
    tracing::info!(address = %settings.http.address(), "admin HTTP surface listening");

    let server_shutdown_rx = shutdown_rx.clone();
    tasks.spawn(async move {
        let mut shutdown_rx = server_shutdown_rx;
        let shutdown_signal = async move {
            let _ = shutdown_rx.changed().await;
        };
        if let Err(err) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!(?err, "admin HTTP server exited with an error");
        }
    });

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    tracing::info!("shutdown signal received, draining in-flight work");
    let _ = shutdown_tx.send(true);

    let drain = async {
        while tasks.join_next().await.is_some() {}
    };
    if tokio::time::timeout(settings.notifier.shutdown_grace, drain)
        .await
        .is_err()
    {
        tracing::warn!("shutdown grace period elapsed with tasks still running, exiting anyway");
    }

    Ok(())
}

async fn run_notification_router(
    store: Store,
    router: RouteResolver,
    poll_interval: std::time::Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    const BATCH_SIZE: i64 = 64;
    loop {
        if *shutdown.borrow() {
            return;
        }

        let notifications = match flapjack_store::notifications::dequeue_unrouted(store.pool(), BATCH_SIZE).await {
            Ok(notifications) => notifications,
            Err(err) => {
                tracing::error!(?err, "failed to dequeue notifications, will retry");
                Vec::new()
            }
        };

        if notifications.is_empty() {
            let jitter = 0.9 + rand::random::<f64>() * 0.2;
            tokio::select! {
                _ = tokio::time::sleep(poll_interval.mul_f64(jitter)) => (),
                _ = shutdown.changed() => (),
            }
            continue;
        }

        for notification in notifications {
            match router.resolve(&notification).await {
                Ok(alerts) => {
                    tracing::debug!(
                        notification_id = %notification.id,
                        alert_count = alerts.len(),
                        "routed notification"
                    );
                }
                Err(err) => {
                    tracing::error!(?err, notification_id = %notification.id, "failed to resolve routes for notification");
                }
            }
        }
    }
}

async fn connect(settings: &config::DatabaseSettings) -> anyhow::Result<sqlx::PgPool> {
    let mut pg_options: sqlx::postgres::PgConnectOptions = settings
        .url
        .parse()
        .context("parsing database URL")?;

    pg_options = match &settings.ca_path {
        Some(ca) => pg_options
            .ssl_mode(sqlx::postgres::PgSslMode::VerifyFull)
            .ssl_root_cert(ca),
        None => pg_options.ssl_mode(sqlx::postgres::PgSslMode::Prefer),
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect_with(pg_options)
        .await
        .context("connecting to database")?;

    let pool_copy = pool.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(120));
        loop {
            interval.tick().await;
            tracing::info!(
                total_connections = pool_copy.size(),
                idle_connections = pool_copy.num_idle(),
                "db connection pool stats"
            );
        }
    });

    Ok(pool)
}

fn init_tracing(app_env: AppEnv) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if app_env == AppEnv::Development {
        registry.with(fmt::layer()).init();
    } else {
        registry.with(fmt::layer().json()).init();
    }
}
