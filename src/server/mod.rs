// Server module entry point
// Binds the listener and runs the accept loop until a shutdown signal

pub mod connection;
pub mod listener;
pub mod serve;
pub mod signal;

use std::sync::Arc;

use crate::config::AppState;
use crate::logger;

// Re-export commonly used items
pub use listener::create_listener;
pub use serve::serve;

/// Bind the configured address and serve until SIGINT/SIGTERM
pub async fn run(state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let addr = state.config.get_socket_addr()?;
    let listener = create_listener(addr)?;

    logger::log_server_start(&listener.local_addr()?, &state.config, state.root.path());

    serve(listener, state, signal::shutdown_signal()).await;

    logger::log_server_stopped();
    Ok(())
}
