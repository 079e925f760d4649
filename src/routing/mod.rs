//! Turning a drop between panes into a concrete operation.

pub mod error;
pub mod executor;
pub mod matrix;
pub mod types;

pub use error::{RoutingError, RoutingResult};
pub use executor::{Dispatch, EnqueueRequest, RouteExecutor};
pub use matrix::classify;
pub use types::{PaneContext, Route, SystemTag, TransferType};
