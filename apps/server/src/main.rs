mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod notify;
mod reminders;
mod schedule;
mod store;

use sqlx::sqlite::SqlitePoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use auth::AccessTokens;
use config::Config;
use notify::{LogNotifier, Notifier, WebhookNotifier};
use reminders::ReminderSweep;
use schedule::{AvailabilityService, BookingLifecycle, ExceptionResolver, SlotGrid, VenueTime};
use store::{RecordStore, SqliteStore};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub store: Arc<dyn RecordStore>,
    pub availability: Arc<AvailabilityService>,
    pub lifecycle: Arc<BookingLifecycle>,
    pub access: AccessTokens,
    pub started_at: Instant,
}

impl AppState {
    /// Wires the scheduling core around one store handle.
    pub fn build(
        db: sqlx::SqlitePool,
        grid: SlotGrid,
        venue: VenueTime,
        notifier: Arc<dyn Notifier>,
        access: AccessTokens,
        max_exception_range_days: u32,
    ) -> Self {
        let store: Arc<dyn RecordStore> = Arc::new(SqliteStore::new(db.clone()));
        let resolver = Arc::new(
            ExceptionResolver::new(store.clone(), grid)
                .with_max_range_days(max_exception_range_days),
        );
        let availability = Arc::new(AvailabilityService::new(store.clone(), resolver));
        let lifecycle = Arc::new(BookingLifecycle::new(
            store.clone(),
            availability.clone(),
            notifier,
            venue,
        ));
        Self {
            db,
            store,
            availability,
            lifecycle,
            access,
            started_at: Instant::now(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // ── Tracing ──
    let env_filter = EnvFilter::from_default_env().add_directive("info".parse()?);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // ── Scheduling configuration: a bad window stops startup ──
    let grid = config.slot_grid()?;
    let venue = VenueTime::new(config.venue_offset()?);
    tracing::info!(
        "Service window {}-{}, {}-minute slots",
        grid.window_start(),
        grid.window_end(),
        grid.slot_minutes()
    );

    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
        None => {
            tracing::warn!("NOTIFY_WEBHOOK_URL not set, notices will only be logged");
            Arc::new(LogNotifier)
        }
    };

    // ── Database ──
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    db::run_migrations(&pool).await?;

    let state = Arc::new(AppState::build(
        pool,
        grid,
        venue,
        notifier.clone(),
        AccessTokens::new(&config.admin_token, config.staff_token.as_deref()),
        config.max_exception_range_days,
    ));

    // ── Background task: booking reminders ──
    let sweep = Arc::new(ReminderSweep::new(
        state.store.clone(),
        notifier,
        grid.clock(),
        config.reminder_lead_minutes,
    ));
    reminders::spawn(
        sweep,
        venue,
        Duration::from_secs(config.reminder_interval_secs),
    );

    // ── CORS: whitelist WEBAPP_URL when configured, otherwise allow any ──
    let cors = match &config.webapp_url {
        Some(url) => {
            let origin: axum::http::HeaderValue = url.parse()?;
            CorsLayer::new()
                .allow_origin(AllowOrigin::list([origin]))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = handlers::routes()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Field booking server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
