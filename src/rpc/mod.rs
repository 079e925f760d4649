//! Request/response layer over the host/UI message channel.
//!
//! Either side can be the caller: `Correlator` turns a fire-and-forget sink
//! into awaitable calls, `RpcRouter` answers the calls that arrive.

pub mod correlator;
pub mod error;
pub mod method;
pub mod router;
pub mod types;

pub use correlator::{Correlator, DEFAULT_REQUEST_TIMEOUT};
pub use error::{ErrorCode, RpcError, RpcResult};
pub use method::Method;
pub use router::{RegistryError, RpcRouter};
pub use types::{Envelope, NoParams, RpcErrorBody, RpcRequest, RpcResponse};
