//! Utilities for the explorer service.

use crate::{ComponentState, ExplorerActor};
use futures::FutureExt;
use std::{panic::AssertUnwindSafe, sync::Arc};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;

/// A spawned actor, as tracked by the [`crate::ExplorerService`].
#[derive(Debug)]
pub(super) struct Component {
    pub(super) name: &'static str,
    pub(super) cancellation: CancellationToken,
    pub(super) state: Arc<watch::Sender<ComponentState>>,
    pub(super) handle: Option<JoinHandle<()>>,
}

impl Component {
    /// Spawns the actor on its own task.
    ///
    /// Errors and panics are caught at the task boundary; either way the component ends up
    /// [`ComponentState::Stopped`] and is not restarted.
    pub(super) fn spawn<A: ExplorerActor>(actor: A, cancellation: CancellationToken) -> Self {
        let (state, _) = watch::channel(ComponentState::Init);
        let state = Arc::new(state);
        let handle = tokio::spawn({
            let state = Arc::clone(&state);
            async move {
                // A stop requested before the first poll wins.
                state.send_if_modified(|state| {
                    if *state != ComponentState::Init {
                        return false;
                    }
                    *state = ComponentState::Running;
                    true
                });
                info!(target: "explorer", component = A::NAME, "Component started");

                match AssertUnwindSafe(actor.start()).catch_unwind().await {
                    Ok(Ok(())) => {
                        info!(target: "explorer", component = A::NAME, "Component stopped");
                    }
                    Ok(Err(err)) => {
                        error!(target: "explorer", component = A::NAME, error = ?err, "Component failed");
                    }
                    Err(_) => {
                        error!(target: "explorer", component = A::NAME, "Component panicked");
                    }
                }
                state.send_replace(ComponentState::Stopped);

                #[cfg(feature = "metrics")]
                metrics::gauge!(crate::Metrics::COMPONENT_STATE, "component" => A::NAME)
                    .set(ComponentState::Stopped as u8 as f64);
            }
        });

        #[cfg(feature = "metrics")]
        metrics::gauge!(crate::Metrics::COMPONENT_STATE, "component" => A::NAME)
            .set(ComponentState::Running as u8 as f64);

        Self { name: A::NAME, cancellation, state, handle: Some(handle) }
    }

    /// Marks the component as stopping and signals it, without waiting.
    fn request_stop(&self) {
        self.state.send_if_modified(|state| {
            if state.is_stopped() {
                return false;
            }
            *state = ComponentState::Stopping;
            true
        });
        self.cancellation.cancel();
    }

    /// Signals the component to stop and waits until it did.
    pub(super) async fn stop(&mut self) {
        self.request_stop();

        let Some(handle) = self.handle.take() else { return };
        if let Err(err) = handle.await {
            error!(target: "explorer", component = self.name, %err, "Component task aborted");
            self.state.send_replace(ComponentState::Stopped);
        }
    }
}

/// Listens for OS shutdown signals (SIGTERM, SIGINT).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target: "explorer", %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(target: "explorer", %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!(target: "explorer", "Received SIGINT (Ctrl+C)");
        },
        _ = terminate => {
            info!(target: "explorer", "Received SIGTERM");
        },
    }
}
