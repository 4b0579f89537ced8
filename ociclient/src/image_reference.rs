use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::digest::{DigestError, OciDigest};

/// Error type for image reference parsing
#[derive(Debug, Error)]
pub enum ImageReferenceError {
    #[error("Invalid image reference format: {0}")]
    InvalidFormat(String),
    #[error("Invalid digest in image reference: {0}")]
    Digest(#[from] DigestError),
}

/// Tag or digest part of an image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Tag(String),
    Digest(OciDigest),
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Tag(tag) => f.write_str(tag),
            Reference::Digest(digest) => write!(f, "{}", digest),
        }
    }
}

/// Represents an OCI image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Optional hostname (registry), including a port if one was given
    pub hostname: Option<String>,
    /// Repository name
    pub name: String,
    /// Tag or digest
    pub reference: Reference,
}

impl ImageReference {
    /// Create a new ImageReference
    pub fn new(hostname: Option<String>, name: String, reference: Reference) -> Self {
        Self {
            hostname,
            name,
            reference,
        }
    }

    /// Registry host, falling back to `default_registry`
    pub fn registry<'a>(&'a self, default_registry: &'a str) -> &'a str {
        self.hostname.as_deref().unwrap_or(default_registry)
    }
}

fn looks_like_hostname(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

impl FromStr for ImageReference {
    type Err = ImageReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // [hostname[:port]/]name[:tag|@digest]
        let invalid = || ImageReferenceError::InvalidFormat(s.to_string());
        if s.is_empty() || s.starts_with('/') || s.chars().any(char::is_whitespace) {
            return Err(invalid());
        }

        let (hostname, remainder) = match s.split_once('/') {
            Some((first, rest)) if looks_like_hostname(first) => (Some(first.to_string()), rest),
            _ => (None, s),
        };

        let (name, reference) = if let Some((name, digest)) = remainder.split_once('@') {
            (name, Reference::Digest(OciDigest::from_str(digest)?))
        } else {
            // A colon after the last slash separates the tag
            let last_segment = remainder.rfind('/').map_or(0, |i| i + 1);
            match remainder[last_segment..].rfind(':') {
                Some(colon) => {
                    let colon = last_segment + colon;
                    let tag = &remainder[colon + 1..];
                    if tag.is_empty() {
                        return Err(invalid());
                    }
                    (&remainder[..colon], Reference::Tag(tag.to_string()))
                }
                None => (remainder, Reference::Tag("latest".to_string())),
            }
        };

        if name.is_empty() || name.ends_with('/') || name.contains("//") {
            return Err(invalid());
        }

        Ok(ImageReference {
            hostname,
            name: name.to_string(),
            reference,
        })
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(hostname) = &self.hostname {
            write!(f, "{}/", hostname)?;
        }
        match &self.reference {
            Reference::Tag(tag) => write!(f, "{}:{}", self.name, tag),
            Reference::Digest(digest) => write!(f, "{}@{}", self.name, digest),
        }
    }
}
