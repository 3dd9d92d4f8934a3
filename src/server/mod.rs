// Server module entry point
// Brings up the host runtime, registers the scheme handler, and serves the
// loopback HTTP front end until shutdown

pub mod connection;
pub mod listener;
pub mod signal;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{AppState, Config};
use crate::host::{HostRuntime, RegistrationError};
use crate::logger;
use crate::scheme::SchemeRegistrar;

// Re-export commonly used items
pub use connection::{accept_connection, scheme_url, serve_request};
pub use listener::create_reusable_listener;
pub use signal::shutdown_signal;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{0}")]
    Address(String),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error("registration task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Bind the listener, signal host readiness, and register the scheme handler
pub async fn bootstrap(config: &Config) -> Result<(TcpListener, Arc<AppState>), StartupError> {
    let addr = config.get_socket_addr().map_err(StartupError::Address)?;
    let listener =
        create_reusable_listener(addr).map_err(|source| StartupError::Bind { addr, source })?;

    let host = Arc::new(HostRuntime::new());
    let registrar = SchemeRegistrar::from_config(&config.scheme);
    let registration = {
        let host = Arc::clone(&host);
        tokio::spawn(async move { registrar.register_when_ready(&host).await })
    };

    // The listener is bound: the host can take requests from here on
    host.signal_ready();
    registration.await??;

    Ok((listener, Arc::new(AppState::new(config, host))))
}

/// Accept connections until `shutdown` resolves
///
/// On shutdown the scheme handler is unregistered; connections still
/// streaming are left to finish on their own tasks.
pub async fn run<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(stream, peer_addr, &state),
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            result = &mut shutdown => {
                result?;
                break;
            }
        }
    }

    state.host.unregister_protocol(&state.config.scheme.name);
    let active = state.active_connections.load(Ordering::SeqCst);
    logger::log_info(&format!(
        "[SHUTDOWN] Listener closed, {active} connection(s) still open"
    ));
    Ok(())
}
