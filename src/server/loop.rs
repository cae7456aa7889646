// Server loop module
// Accepts connections until a shutdown is requested, then drains them

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::{accept_connection, connection_timeout};
use crate::config::AppState;
use crate::logger;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Run the accept loop on `listener`.
///
/// Once shutdown is requested the listener is closed and the loop waits for
/// open connections to finish, at most one connection timeout long. Must run
/// inside the `LocalSet` that owns the connection tasks.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
) {
    let mut shutdown = state.shutdown_listener();

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            _ = shutdown.wait_for(|stop| *stop) => break,
        }
    }

    drop(listener);
    logger::log_shutdown(active_connections.load(Ordering::SeqCst));

    let deadline = connection_timeout(&state.config.performance);
    let _ = tokio::time::timeout(deadline, drain_connections(&active_connections)).await;
    logger::log_drain_result(active_connections.load(Ordering::SeqCst));
}

/// Wait until every accepted connection has ended
async fn drain_connections(active_connections: &AtomicUsize) {
    while active_connections.load(Ordering::SeqCst) > 0 {
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}
