//! [ExplorerActor] trait.

use async_trait::async_trait;
use tokio_util::sync::WaitForCancellationFuture;

/// The shutdown context of an actor.
pub trait CancellableContext: Send {
    /// Returns a future that resolves when the actor is asked to stop.
    fn cancelled(&self) -> WaitForCancellationFuture<'_>;
}

/// A long-running component of the explorer.
///
/// Actors are built with everything they need, including their own cancellation token, and
/// handed to the [`ExplorerService`] which drives their lifecycle:
/// 1. Build: construct the actor and the channels other components use to reach it.
/// 2. Start: the service spawns [`ExplorerActor::start`] on its own task.
/// 3. Stop: the service cancels the actor's token. `start` returns once the actor's
///    background work is done.
///
/// [`ExplorerService`]: crate::ExplorerService
#[async_trait]
pub trait ExplorerActor: CancellableContext + 'static {
    /// The error type for the actor.
    type Error: std::fmt::Debug;

    /// The name of the actor, used in logs and lifecycle reporting.
    const NAME: &'static str;

    /// Runs the actor until it is cancelled or fails.
    async fn start(self) -> Result<(), Self::Error>;
}
