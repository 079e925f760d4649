//! Dual-pane file manager engine: local and remote file operations, a
//! transfer job queue, cross-system routing and the RPC channel the UI
//! talks to.

pub mod api;
pub mod config;
pub mod fs;
pub mod host;
pub mod integrity;
pub mod logging;
pub mod metrics;
pub mod remote;
pub mod routing;
pub mod rpc;
pub mod transfer;
pub mod transport;
