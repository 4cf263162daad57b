//! Ticketing Service - Main Application Entry Point
//!
//! This is a REST API server for B2B digital ticketing: businesses configure
//! capacity-limited services (coat checks, bag storage, parking), issue
//! signed QR tickets that each claim one of a finite pool of slots, and
//! later scan and release those tickets.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries, row-level locking)
//! - **Authentication**: API key with SHA-256 hashing
//! - **QR payloads**: HMAC-SHA256 signed, base64url encoded
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

use tracing_subscriber::EnvFilter;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use ticketing_service::{config, db, handlers, middleware};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging. Reads RUST_LOG, defaults to "info".
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // Authenticated routes (API endpoints)
    let authenticated_routes = Router::new()
        // Service management
        .route("/api/v1/services", post(handlers::services::create_service))
        .route("/api/v1/services", get(handlers::services::list_services))
        .route("/api/v1/services/{id}", get(handlers::services::get_service))
        .route(
            "/api/v1/services/{id}",
            delete(handlers::services::delete_service),
        )
        .route(
            "/api/v1/services/{id}/stats",
            get(handlers::services::get_service_stats),
        )
        .route(
            "/api/v1/services/{id}/tickets",
            get(handlers::services::list_active_tickets),
        )
        // Ticket lifecycle
        .route("/api/v1/tickets/checkin", post(handlers::tickets::check_in))
        .route("/api/v1/tickets/scan", post(handlers::tickets::scan))
        .route(
            "/api/v1/tickets/{id}/release",
            post(handlers::tickets::release),
        )
        .route("/api/v1/tickets", get(handlers::tickets::list_my_tickets))
        // Webhook registry
        .route("/api/v1/webhooks", post(handlers::webhooks::create_webhook))
        .route("/api/v1/webhooks", get(handlers::webhooks::list_webhooks))
        .route(
            "/api/v1/webhooks/{id}",
            delete(handlers::webhooks::delete_webhook),
        )
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            pool.clone(),
            middleware::auth::auth_middleware,
        ));

    // Combine authenticated routes with public routes
    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/v1/auth/business/register",
            post(handlers::auth::register_business),
        )
        .route(
            "/api/v1/auth/customer/login",
            post(handlers::auth::customer_login),
        )
        .merge(authenticated_routes)
        // Distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // Share database pool with all handlers via State extraction
        .with_state(pool);

    // Bind and serve
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
