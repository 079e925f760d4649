use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::integrity::error::IntegrityError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumType {
    Md5,
    Sha1,
    #[default]
    Sha256,
    Blake3,
}

impl ChecksumType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumType::Md5 => "md5",
            ChecksumType::Sha1 => "sha1",
            ChecksumType::Sha256 => "sha256",
            ChecksumType::Blake3 => "blake3",
        }
    }

    /// Length of the lowercase hex digest.
    pub fn hex_len(&self) -> usize {
        match self {
            ChecksumType::Md5 => 32,
            ChecksumType::Sha1 => 40,
            ChecksumType::Sha256 | ChecksumType::Blake3 => 64,
        }
    }
}

impl fmt::Display for ChecksumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumType {
    type Err = IntegrityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "md5" => Ok(ChecksumType::Md5),
            "sha1" => Ok(ChecksumType::Sha1),
            "sha256" => Ok(ChecksumType::Sha256),
            "blake3" => Ok(ChecksumType::Blake3),
            _ => Err(IntegrityError::UnknownAlgorithm(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub success: bool,
    pub checksum_type: ChecksumType,
    pub expected: String,
    pub actual: String,
    pub verified_at: i64,
}

impl VerificationResult {
    pub fn compare(checksum_type: ChecksumType, expected: &str, actual: &str) -> Self {
        Self {
            success: expected.eq_ignore_ascii_case(actual),
            checksum_type,
            expected: expected.to_ascii_lowercase(),
            actual: actual.to_ascii_lowercase(),
            verified_at: chrono::Utc::now().timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_algorithms() {
        assert_eq!("MD5".parse::<ChecksumType>().unwrap(), ChecksumType::Md5);
        assert_eq!("sha-256".parse::<ChecksumType>().unwrap(), ChecksumType::Sha256);
        assert!("crc32".parse::<ChecksumType>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&ChecksumType::Sha1).unwrap();
        assert_eq!(json, "\"sha1\"");
    }

    #[test]
    fn test_compare_ignores_case() {
        let result = VerificationResult::compare(ChecksumType::Md5, "ABCD", "abcd");
        assert!(result.success);
    }
}
