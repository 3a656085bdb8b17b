// Connection handling module
// Serves a single accepted TCP connection and tracks how many are open

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Counts open connections and enforces `performance.max_connections`
#[derive(Debug, Clone)]
pub struct ConnectionLimiter {
    active: Arc<AtomicUsize>,
    max: Option<usize>,
}

/// Holds one slot of the limiter until dropped
#[derive(Debug)]
pub struct ConnectionGuard {
    active: Arc<AtomicUsize>,
}

impl ConnectionLimiter {
    pub fn new(max: Option<usize>) -> Self {
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            max,
        }
    }

    /// Reserve a slot, or `None` when the limit is reached
    pub fn try_acquire(&self) -> Option<ConnectionGuard> {
        // Increment first, then check, so two racing accepts cannot both pass
        let prev = self.active.fetch_add(1, Ordering::SeqCst);
        if self.max.is_some_and(|max| prev >= max) {
            self.active.fetch_sub(1, Ordering::SeqCst);
            return None;
        }
        Some(ConnectionGuard {
            active: Arc::clone(&self.active),
        })
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Accept a connection if the limiter allows it and serve it on its own task
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    limiter: &ConnectionLimiter,
) {
    let Some(guard) = limiter.try_acquire() else {
        warn!(
            peer = %peer_addr,
            active = limiter.active(),
            "Max connections reached, connection rejected"
        );
        drop(stream);
        return;
    };

    debug!(peer = %peer_addr, "Connection accepted");
    handle_connection(stream, peer_addr, Arc::clone(state), guard);
}

/// Serve HTTP/1.1 on `stream` until the client goes away.
///
/// `read_timeout` bounds how long a request head may take to arrive;
/// `write_timeout`, when non-zero, bounds the whole connection, long
/// streams included.
fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    guard: ConnectionGuard,
) {
    tokio::spawn(async move {
        let _guard = guard;
        if let Err(error) = stream.set_nodelay(true) {
            debug!(peer = %peer_addr, %error, "Failed to set TCP_NODELAY");
        }
        let io = TokioIo::new(stream);

        let performance = &state.config.performance;
        let write_timeout = performance.write_timeout;

        let mut builder = http1::Builder::new();
        builder.keep_alive(performance.keep_alive);
        builder.timer(TokioTimer::new());
        if performance.read_timeout > 0 {
            builder.header_read_timeout(Duration::from_secs(performance.read_timeout));
        }

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                handler::handle_request(req, Arc::clone(&service_state), Some(peer_addr))
            }),
        );

        let result = if write_timeout > 0 {
            match tokio::time::timeout(Duration::from_secs(write_timeout), conn).await {
                Ok(result) => result,
                Err(_) => {
                    debug!(peer = %peer_addr, seconds = write_timeout, "Connection timed out");
                    return;
                }
            }
        } else {
            conn.await
        };

        if let Err(err) = result {
            if is_client_disconnect(&err) {
                debug!(peer = %peer_addr, error = %err, "Client went away");
            } else {
                logger::log_connection_error(&peer_addr, &err);
            }
        }
    });
}

/// Players abort range requests all the time when seeking; that is not an error
fn is_client_disconnect(err: &hyper::Error) -> bool {
    if err.is_incomplete_message() || err.is_canceled() || err.is_closed() || err.is_timeout() {
        return true;
    }
    std::error::Error::source(err)
        .and_then(|source| source.downcast_ref::<io::Error>())
        .is_some_and(|io_err| {
            matches!(
                io_err.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_without_max() {
        let limiter = ConnectionLimiter::new(None);
        let guards: Vec<_> = (0..100).filter_map(|_| limiter.try_acquire()).collect();
        assert_eq!(guards.len(), 100);
        assert_eq!(limiter.active(), 100);
        drop(guards);
        assert_eq!(limiter.active(), 0);
    }

    #[test]
    fn test_limiter_rejects_over_max() {
        let limiter = ConnectionLimiter::new(Some(2));
        let first = limiter.try_acquire();
        let second = limiter.try_acquire();
        assert!(first.is_some());
        assert!(second.is_some());
        assert!(limiter.try_acquire().is_none());
        assert_eq!(limiter.active(), 2);

        drop(first);
        assert!(limiter.try_acquire().is_some());
    }
}
