use askrelay::accumulator::StreamContentRegistry;
use askrelay::adaptor::AiServiceClient;
use askrelay::config::Config;
use askrelay::db::setup_db;
use askrelay::{router, AppState};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().expect("missing required environment variables");

    let db = setup_db(&config.database_url);
    let answer_client = Arc::new(AiServiceClient::new(config.ai_service_url.clone()));

    let state = Arc::new(AppState {
        db,
        answer_client,
        stream_contents: StreamContentRegistry::new(),
    });

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind");
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("server error");
}
