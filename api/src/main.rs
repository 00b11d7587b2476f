mod error;
mod message_payload;
mod routes;
mod session_response;
mod state;

use chatbot::Config;
use state::AppState;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize environment variables and logging
    dotenv::dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e:#}");
            std::process::exit(1);
        }
    };

    let addr = config.addr.clone();
    let state = match AppState::new(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            eprintln!("Failed to initialize chat service: {e:#}");
            std::process::exit(1);
        }
    };

    tokio::spawn(state.clone().sweep_idle_sessions());

    let app = routes::app(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    log::info!("Listening on {addr}");
    println!("Chat page available at http://{addr}/");

    if let Err(e) = axum::serve(listener, app).await {
        log::error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
