pub mod error;
pub mod types;
pub mod verifier;

pub use error::{IntegrityError, IntegrityResult};
pub use types::{ChecksumType, VerificationResult};
pub use verifier::{IntegrityVerifier, StreamingHasher};
