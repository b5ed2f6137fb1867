//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        crypto::ChaChaFieldCipher, db::DbAdapter, identity::JwtIdentityAdapter,
        storage::ObjectStorageAdapter, worker::AnalysisWorkerAdapter,
    },
    config::Config,
    error::ApiError,
    web::{
        goals::{add_goal_handler, delete_goal_handler, get_goals_handler, update_goal_handler},
        hub::LiveStatusHub,
        insights::get_insights_handler,
        middleware::require_auth,
        quotes::daily_quote_handler,
        rest::{
            create_entry_handler, delete_entry_handler, get_entry_handler, list_entries_handler,
            reanalyze_entry_handler, update_title_handler, ApiDoc,
        },
        state::AppState,
        webhook::handle_ai_result,
        ws_handler,
    },
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let http_client = reqwest::Client::new();

    let storage_adapter = Arc::new(ObjectStorageAdapter::new(
        http_client.clone(),
        config.storage_url.clone(),
        config.storage_service_key.clone(),
        config.storage_bucket.clone(),
    ));
    let analysis_adapter = Arc::new(AnalysisWorkerAdapter::new(
        http_client,
        config.analysis_worker_url.clone(),
    ));
    let identity_adapter = Arc::new(JwtIdentityAdapter::new(&config.auth_jwt_secret));
    let field_cipher = Arc::new(ChaChaFieldCipher::new(&config.encryption_key));
    let hub = Arc::new(LiveStatusHub::new());

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        storage: storage_adapter,
        analysis: analysis_adapter,
        identity: identity_adapter,
        cipher: field_cipher,
        publisher: hub.clone(),
        hub,
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {e}")))?,
        )
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Public routes (no auth required): the webhook authenticates by shared
    // knowledge of dispatch metadata, and the daily quote is anonymous.
    let public_routes = Router::new()
        .route("/webhooks/handleAiResult", post(handle_ai_result))
        .route("/quotes/getDailyQuote", get(daily_quote_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/entries/createEntry", post(create_entry_handler))
        .route("/entries/getEntryById", get(get_entry_handler))
        .route("/entries/getEntriesList", get(list_entries_handler))
        .route("/entries/updateTitle", patch(update_title_handler))
        .route("/entries/reanalyzeEntry", get(reanalyze_entry_handler))
        .route("/entries/deleteEntry", delete(delete_entry_handler))
        .route("/goals/addGoal", post(add_goal_handler))
        .route("/goals/getGoals", get(get_goals_handler))
        .route("/goals/updateGoal", put(update_goal_handler))
        .route("/goals/deleteGoal", delete(delete_goal_handler))
        .route("/insights/getInsights", get(get_insights_handler))
        .route("/ws", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
