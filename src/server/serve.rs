// Server loop module
// Accepts connections until the shutdown future resolves

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use super::connection::{accept_connection, ConnectionLimiter};
use crate::config::AppState;
use crate::logger;

/// How long open connections get to finish after shutdown is requested
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Back-off after a failed accept (e.g. out of file descriptors)
const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(100);

/// Accept loop
///
/// Returns once `shutdown` resolves and in-flight connections have drained
/// or `DRAIN_TIMEOUT` has passed.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F)
where
    F: Future<Output = &'static str>,
{
    let limiter = ConnectionLimiter::new(state.config.performance.max_connections);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &limiter);
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {e}");
                        sleep(ACCEPT_ERROR_DELAY).await;
                    }
                }
            }

            signal = &mut shutdown => {
                logger::log_shutdown_requested(signal);
                break;
            }
        }
    }

    // Stop accepting before waiting on the open connections
    drop(listener);
    drain_connections(&limiter).await;
}

async fn drain_connections(limiter: &ConnectionLimiter) {
    let deadline = Instant::now() + DRAIN_TIMEOUT;
    while limiter.active() > 0 {
        if Instant::now() >= deadline {
            warn!(
                active = limiter.active(),
                "Shutting down with connections still open"
            );
            return;
        }
        sleep(DRAIN_POLL_INTERVAL).await;
    }
    info!("All connections closed");
}
