use crate::integrity::error::{IntegrityError, IntegrityResult};
use crate::integrity::types::{ChecksumType, VerificationResult};
use sha2::Digest;
use std::path::Path;
use tokio::io::AsyncReadExt;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Incremental digest over any supported algorithm.
pub enum StreamingHasher {
    Md5(md5::Context),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl StreamingHasher {
    pub fn new(checksum_type: ChecksumType) -> Self {
        match checksum_type {
            ChecksumType::Md5 => StreamingHasher::Md5(md5::Context::new()),
            ChecksumType::Sha1 => StreamingHasher::Sha1(sha1::Sha1::new()),
            ChecksumType::Sha256 => StreamingHasher::Sha256(sha2::Sha256::new()),
            ChecksumType::Blake3 => StreamingHasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            StreamingHasher::Md5(ctx) => ctx.consume(data),
            StreamingHasher::Sha1(h) => h.update(data),
            StreamingHasher::Sha256(h) => h.update(data),
            StreamingHasher::Blake3(h) => {
                h.update(data);
            }
        }
    }

    /// Lowercase hex digest.
    pub fn finalize_hex(self) -> String {
        match self {
            StreamingHasher::Md5(ctx) => format!("{:x}", ctx.compute()),
            StreamingHasher::Sha1(h) => hex::encode(h.finalize()),
            StreamingHasher::Sha256(h) => hex::encode(h.finalize()),
            StreamingHasher::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

pub struct IntegrityVerifier;

impl IntegrityVerifier {
    /// Checksum for a byte slice
    pub fn calculate_checksum(data: &[u8], checksum_type: ChecksumType) -> String {
        let mut hasher = StreamingHasher::new(checksum_type);
        hasher.update(data);
        hasher.finalize_hex()
    }

    /// Checksum for a file, read in fixed-size pieces
    pub async fn calculate_file_checksum(
        path: &Path,
        checksum_type: ChecksumType,
    ) -> IntegrityResult<String> {
        let read_error = |source: std::io::Error| {
            if source.kind() == std::io::ErrorKind::NotFound {
                IntegrityError::FileNotFound(format!("{}: {}", path.display(), source))
            } else {
                IntegrityError::Read {
                    path: path.display().to_string(),
                    source,
                }
            }
        };
        let mut file = tokio::fs::File::open(path).await.map_err(read_error)?;

        let mut hasher = StreamingHasher::new(checksum_type);
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];

        loop {
            let n = file.read(&mut buffer).await.map_err(read_error)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(hasher.finalize_hex())
    }

    /// Compare two digests of the same algorithm
    pub fn verify_digest(
        checksum_type: ChecksumType,
        expected: &str,
        actual: &str,
    ) -> IntegrityResult<VerificationResult> {
        let result = VerificationResult::compare(checksum_type, expected, actual);
        if !result.success {
            return Err(IntegrityError::ChecksumMismatch {
                algorithm: checksum_type,
                expected: result.expected,
                actual: result.actual,
            });
        }
        Ok(result)
    }

    /// Hash a file and compare it with a known digest
    pub async fn verify_file(
        path: &Path,
        checksum_type: ChecksumType,
        expected: &str,
    ) -> IntegrityResult<VerificationResult> {
        let actual = Self::calculate_file_checksum(path, checksum_type).await?;
        Self::verify_digest(checksum_type, expected, &actual)
    }
}
