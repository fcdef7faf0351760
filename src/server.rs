//! Loopback server that receives the browser redirect of one login attempt.
//!
//! The server runs on its own tokio task. The driver first waits for
//! [`CallbackServer::ready`], which resolves once the socket is bound and
//! accepting, and only then sends the user to the authorize URL. It then
//! waits for [`ListeningCallbackServer::outcome`], which resolves with the
//! classification of the first request to `/authorize`. By the time either
//! call returns an error or an outcome, the listener has been dropped and
//! the port is free again.

use std::{future::IntoFuture, net::SocketAddr, time::Duration};

use tokio::{
    net::TcpListener,
    sync::oneshot,
    task::JoinHandle,
};
use tracing::debug;

use crate::{
    api::{self, CallbackState},
    error::{AuthError, Result},
    types::{AuthorizationOutcome, FlowState},
};

/// How long connections still open after the outcome may take to finish.
/// A client that never completes its request is cut off after this.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// A callback server that has been spawned but may not be listening yet.
///
/// Dropping it (or the [`ListeningCallbackServer`] it turns into) stops the
/// server and frees the port.
#[derive(Debug)]
pub struct CallbackServer {
    ready_rx: oneshot::Receiver<SocketAddr>,
    worker: Worker,
}

/// A callback server whose socket is accepting connections.
#[derive(Debug)]
pub struct ListeningCallbackServer {
    local_addr: SocketAddr,
    worker: Worker,
}

/// Server task handle that aborts the task when dropped.
#[derive(Debug)]
struct Worker(Option<JoinHandle<Result<AuthorizationOutcome>>>);

impl Worker {
    async fn join(mut self) -> Result<AuthorizationOutcome> {
        let Some(handle) = self.0.take() else {
            return Err(closed());
        };
        handle
            .await
            .map_err(|e| AuthError::CallbackServer(format!("server task failed: {e}")))?
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

impl CallbackServer {
    /// Spawns the server task, which binds `bind_addr` straight away.
    ///
    /// `timeout` bounds the wait for the redirect; `None` waits forever.
    pub fn start(
        bind_addr: SocketAddr,
        expected_state: FlowState,
        timeout: Option<Duration>,
    ) -> Self {
        let (ready_tx, ready_rx) = oneshot::channel();
        let worker = tokio::spawn(serve(bind_addr, expected_state, timeout, ready_tx));
        Self {
            ready_rx,
            worker: Worker(Some(worker)),
        }
    }

    /// Waits until the listener accepts connections.
    ///
    /// # Errors
    ///
    /// Returns the worker's error (typically [`AuthError::Bind`]) if it
    /// stopped before it started listening.
    pub async fn ready(self) -> Result<ListeningCallbackServer> {
        match self.ready_rx.await {
            Ok(local_addr) => Ok(ListeningCallbackServer {
                local_addr,
                worker: self.worker,
            }),
            Err(_) => match self.worker.join().await {
                Err(e) => Err(e),
                Ok(_) => Err(AuthError::CallbackServer(
                    "server finished before it was listening".to_string(),
                )),
            },
        }
    }
}

impl ListeningCallbackServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the single outcome of this login attempt.
    pub async fn outcome(self) -> Result<AuthorizationOutcome> {
        self.worker.join().await
    }
}

async fn serve(
    bind_addr: SocketAddr,
    expected_state: FlowState,
    timeout: Option<Duration>,
    ready_tx: oneshot::Sender<SocketAddr>,
) -> Result<AuthorizationOutcome> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|source| AuthError::Bind {
            addr: bind_addr,
            source,
        })?;
    let local_addr = listener.local_addr()?;

    if ready_tx.send(local_addr).is_err() {
        debug!(%local_addr, "callback server abandoned before listening");
        return Err(AuthError::CallbackServer(
            "driver went away before the server was ready".to_string(),
        ));
    }

    let (outcome_tx, outcome_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let app = api::router(CallbackState::new(expected_state, outcome_tx));

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);
    debug!(%local_addr, "callback server listening");

    let wait_for_outcome = async move {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, outcome_rx).await {
                Ok(received) => received.map_err(|_| closed()),
                Err(_) => Err(AuthError::Timeout(limit)),
            },
            None => outcome_rx.await.map_err(|_| closed()),
        }
    };

    let outcome = tokio::select! {
        served = &mut server => {
            served?;
            return Err(closed());
        }
        outcome = wait_for_outcome => outcome,
    };

    // Let in-flight responses finish, but never wait on a stalled client.
    let _ = shutdown_tx.send(());
    match tokio::time::timeout(DRAIN_TIMEOUT, &mut server).await {
        Ok(served) => served?,
        Err(_) => debug!(%local_addr, "dropping connections still open after shutdown"),
    }
    debug!(%local_addr, "callback server stopped");

    outcome
}

fn closed() -> AuthError {
    AuthError::CallbackServer("outcome channel closed".to_string())
}
