use squad_api::agents::CommandRouter;
use squad_api::api;
use squad_api::config::AppConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("squad_api=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env();

    let router = CommandRouter::from_config(&config).expect("Failed to build command router");
    let seeded = router
        .seed_default_roster()
        .await
        .expect("Failed to seed default roster");
    tracing::info!("Seeded {} agents", seeded.len());

    // Probe the backend without holding up startup; commands use the
    // simulator until it connects
    tokio::spawn({
        let router = router.clone();
        async move {
            if router.reconnect().await {
                tracing::info!("Execution backend connected");
            } else {
                tracing::warn!("Execution backend unavailable, using local simulator");
            }
        }
    });

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::router(router.clone())
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    tracing::info!("Server listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
        })
        .await
        .expect("Server failed");

    router.shutdown().await;
}
