use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use booking_cell::{BookingService, InMemoryBookingRepository, InMemoryStaffBookingRepository, StaffBookingService};
use branch_cell::{BranchService, InMemoryBranchDirectory};
use queue_cell::{InMemoryTicketRepository, QueueSequencer, RedisTicketRepository, TicketRepository};
use shared_config::AppConfig;
use shared_database::{RedisPool, TransactionGate};
use shared_utils::clock::{Clock, SystemClock};

use crate::router::Services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting branch booking and queue API server");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());
    if !config.is_configured() {
        warn!("JWT_SECRET is empty; every authenticated route will reject requests");
    }

    let services = build_services(&config).await?;

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(config.clone(), services)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = config.bind_address();
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

async fn build_services(config: &AppConfig) -> anyhow::Result<Services> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let gate = Arc::new(TransactionGate::new());
    let directory = Arc::new(InMemoryBranchDirectory::new());

    let tickets: Arc<dyn TicketRepository> = if config.uses_redis_ticket_store() {
        let pool = RedisPool::connect(config)
            .await
            .context("failed to connect to Redis ticket store")?;
        Arc::new(RedisTicketRepository::new(pool))
    } else {
        info!("REDIS_URL not set, tickets are kept in memory");
        Arc::new(InMemoryTicketRepository::new())
    };

    let branches = Arc::new(BranchService::new(directory.clone(), clock.clone()));
    let bookings = Arc::new(BookingService::new(
        Arc::new(InMemoryBookingRepository::new()),
        directory.clone(),
        gate.clone(),
        clock.clone(),
        config.lookup_code_attempts,
    ));
    let staff_bookings = Arc::new(StaffBookingService::new(
        Arc::new(InMemoryStaffBookingRepository::new()),
        directory.clone(),
        gate,
        clock.clone(),
    ));
    let queue = Arc::new(QueueSequencer::new(tickets, bookings.clone(), directory, clock));

    Ok(Services { branches, bookings, staff_bookings, queue })
}
