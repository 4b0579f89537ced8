use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Error type for OCI digest operations
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("Invalid digest format: {0}")]
    InvalidFormat(String),
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Represents an OCI content digest
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OciDigest {
    algorithm: String,
    hex: String,
}

impl OciDigest {
    /// Compute the sha256 digest of the given content
    pub fn from_bytes(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self {
            algorithm: "sha256".to_string(),
            hex: hex::encode(hasher.finalize()),
        }
    }

    /// Digest of the empty byte sequence
    pub fn empty() -> Self {
        Self::from_bytes(&[])
    }

    /// Get the algorithm part of the digest
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Get the hex part of the digest
    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Check that `content` hashes to this digest
    pub fn verify(&self, content: &[u8]) -> bool {
        self.algorithm == "sha256" && *self == Self::from_bytes(content)
    }
}

fn expected_hex_len(algorithm: &str) -> Option<usize> {
    match algorithm {
        "sha256" => Some(64),
        "sha512" => Some(128),
        _ => None,
    }
}

impl fmt::Display for OciDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

impl FromStr for OciDigest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (algorithm, hex) = s
            .split_once(':')
            .ok_or_else(|| DigestError::InvalidFormat(s.to_string()))?;

        let expected_len = expected_hex_len(algorithm)
            .ok_or_else(|| DigestError::UnsupportedAlgorithm(algorithm.to_string()))?;

        // Registries only hand out lowercase hex
        if hex.len() != expected_len
            || !hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(DigestError::InvalidFormat(s.to_string()));
        }

        Ok(OciDigest {
            algorithm: algorithm.to_string(),
            hex: hex.to_string(),
        })
    }
}

impl serde::Serialize for OciDigest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for OciDigest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        OciDigest::from_str(&s).map_err(serde::de::Error::custom)
    }
}
