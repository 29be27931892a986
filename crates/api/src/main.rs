use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use surat_api::background;
use surat_api::config::ServerConfig;
use surat_api::router::build_app_router;
use surat_api::state::AppState;
use surat_events::{EventBus, NotificationDispatcher};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env();

    let pool = surat_db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    surat_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    surat_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Event bus and notification delivery ---
    let event_bus = Arc::new(EventBus::default());
    let dispatcher_handle = tokio::spawn(
        NotificationDispatcher::new(pool.clone()).run(event_bus.subscribe()),
    );
    tracing::info!("Notification dispatcher started");

    let state = AppState::new(pool, config.clone(), Arc::clone(&event_bus));

    // --- Deadline reminders ---
    let reminder_cancel = CancellationToken::new();
    let reminder_handle = tokio::spawn(background::deadline_reminders::run(
        Arc::clone(&state.ports.dispositions),
        Arc::clone(&state.ports.notifier),
        config.reminders,
        reminder_cancel.clone(),
    ));

    let app = build_app_router(state, &config);

    let addr = SocketAddr::new(config.host.parse().expect("Invalid HOST"), config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    let drain = Duration::from_secs(config.shutdown_timeout_secs);

    reminder_cancel.cancel();
    let _ = tokio::time::timeout(drain, reminder_handle).await;

    // The router and its state are gone; dropping the last bus handle closes
    // the channel so the dispatcher drains what is queued and exits.
    drop(event_bus);
    let _ = tokio::time::timeout(drain, dispatcher_handle).await;

    tracing::info!("Graceful shutdown complete");
}

/// `LOG_FORMAT=json` switches to JSON lines; anything else is the
/// human-readable formatter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "surat_api=debug,surat_workflow=debug,surat_events=debug,tower_http=debug".into()
    });
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
