use serde::Serialize;

/// Lifecycle state of a component of the [`crate::ExplorerService`].
///
/// States only move forward: `Init -> Running -> Stopping -> Stopped`. A component that fails
/// or panics goes straight to `Stopped`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ComponentState {
    /// Built, not started yet.
    #[default]
    Init,
    /// Running its main loop.
    Running,
    /// Asked to stop, finishing its background work.
    Stopping,
    /// Finished.
    Stopped,
}

impl ComponentState {
    /// Returns true once the component finished.
    pub const fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}
