//! The [`BlockObserverActor`].

mod actor;
pub use actor::{AGGREGATION_GRACE, BlockObserverActor, ObserverConfig, SHRINK_EVERY_BLOCKS};

mod error;
pub use error::ObserverError;

mod workers;
