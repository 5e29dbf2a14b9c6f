//! Core [`ExplorerService`], composing the [`ExplorerActor`]s into a running explorer.
//!
//! [`ExplorerActor`]: crate::ExplorerActor

mod config;
pub use config::{ConfigError, ExplorerConfig};

mod error;
pub use error::ServiceError;

mod state;
pub use state::ComponentState;

mod builder;
pub use builder::ExplorerServiceBuilder;

mod explorer;
pub use explorer::ExplorerService;

mod util;
pub use util::shutdown_signal;
