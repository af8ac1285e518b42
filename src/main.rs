use mytasks_api_rust::{config, server, state::AppState};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up SECRET_KEY, MYTASKS_DATA_DIR, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!(environment = ?config.environment, "starting MyTasks API");

    let state = AppState::from_config(config);
    let app = server::app(state);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("MyTasks API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
