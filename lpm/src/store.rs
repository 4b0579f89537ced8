//! Content-addressable staging area the reference artifact is assembled into
//! before it is copied to a registry.

use std::collections::HashMap;

use bytes::Bytes;
use ociclient::{Descriptor, OciDigest};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("content does not match digest {expected}")]
    DigestMismatch { expected: OciDigest },

    #[error("content of {digest} is {actual} bytes, descriptor says {expected}")]
    SizeMismatch {
        digest: OciDigest,
        expected: i64,
        actual: usize,
    },
}

/// Storage for descriptors and their content, plus named manifests
pub trait ContentStore: Send + Sync {
    /// Store `content` under the identity of `descriptor`.
    fn put(&mut self, descriptor: &Descriptor, content: Bytes) -> Result<(), StoreError>;

    /// Store a manifest and make it resolvable under `reference`.
    fn store_manifest(
        &mut self,
        reference: &str,
        descriptor: &Descriptor,
        content: Bytes,
    ) -> Result<(), StoreError>;

    fn resolve(&self, reference: &str) -> Option<Descriptor>;

    fn fetch(&self, digest: &OciDigest) -> Option<Bytes>;
}

/// In-memory [`ContentStore`], discarded with the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: HashMap<OciDigest, Bytes>,
    names: HashMap<String, Descriptor>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs held
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

fn check(descriptor: &Descriptor, content: &[u8]) -> Result<(), StoreError> {
    if descriptor.size != content.len() as i64 {
        return Err(StoreError::SizeMismatch {
            digest: descriptor.digest.clone(),
            expected: descriptor.size,
            actual: content.len(),
        });
    }
    if !descriptor.digest.verify(content) {
        return Err(StoreError::DigestMismatch {
            expected: descriptor.digest.clone(),
        });
    }
    Ok(())
}

impl ContentStore for MemoryStore {
    fn put(&mut self, descriptor: &Descriptor, content: Bytes) -> Result<(), StoreError> {
        check(descriptor, &content)?;
        self.blobs.entry(descriptor.digest.clone()).or_insert(content);
        Ok(())
    }

    fn store_manifest(
        &mut self,
        reference: &str,
        descriptor: &Descriptor,
        content: Bytes,
    ) -> Result<(), StoreError> {
        self.put(descriptor, content)?;
        self.names.insert(reference.to_string(), descriptor.clone());
        Ok(())
    }

    fn resolve(&self, reference: &str) -> Option<Descriptor> {
        self.names.get(reference).cloned()
    }

    fn fetch(&self, digest: &OciDigest) -> Option<Bytes> {
        self.blobs.get(digest).cloned()
    }
}
