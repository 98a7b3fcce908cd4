mod config;
mod context;
mod database;
mod error;
mod features;
mod filters;
mod handlers;
mod models;
mod report;

use axum::{
    response::Redirect,
    routing::get,
    Router,
};
use std::env;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
};
use dotenvy::dotenv;

use config::AppConfig;
use database::{Database, create_database_pool};
use features::Features;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
    pub features: Features,
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    let config = AppConfig::from_env();

    // Initialize database
    let database_url = env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set");

    let db = create_database_pool(&database_url).await
        .expect("Failed to connect to database");

    // Detect optional capabilities once; cached for the process lifetime
    let features = Features::detect(&db).await
        .expect("Failed to probe optional features");

    // Build the application router
    let app = create_router(AppState { db, config, features });

    // Get port from environment or use default
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{}", port);

    println!("🚀 Massbal server starting on http://{}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::permanent("/mass-balance") }))

        // Mass balance report routes
        .route("/mass-balance", get(handlers::mass_balance::start_form))
        .route("/mass-balance/report", get(handlers::mass_balance::report))

        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
        )
        .with_state(state)
}
