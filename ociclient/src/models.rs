use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::digest::OciDigest;

/// Media type of an OCI image manifest
pub const OCI_IMAGE_MANIFEST_MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";
/// Media type of a Docker distribution v2 manifest
pub const DOCKER_MANIFEST_V2_MEDIA_TYPE: &str =
    "application/vnd.docker.distribution.manifest.v2+json";

/// Arbitrary string metadata attached to a descriptor or manifest.
///
/// Ordered so that serialized output is stable across runs.
pub type Annotations = BTreeMap<String, String>;

/// Represents a descriptor for a content blob in an OCI registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content
    pub media_type: String,
    /// Digest of the referenced content
    pub digest: OciDigest,
    /// Size of the referenced content in bytes
    pub size: i64,
    /// Optional annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: Annotations,
}

impl Descriptor {
    /// Describe `content` under the given media type
    pub fn for_content(media_type: impl Into<String>, content: &[u8]) -> Self {
        Self {
            media_type: media_type.into(),
            digest: OciDigest::from_bytes(content),
            size: content.len() as i64,
            annotations: Annotations::new(),
        }
    }
}

/// Represents an OCI image manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    /// Schema version of the manifest
    pub schema_version: i32,
    /// Media type of the manifest
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub media_type: String,
    /// Descriptor for the config blob
    pub config: Descriptor,
    /// Descriptors for the layer blobs, bottom layer first
    pub layers: Vec<Descriptor>,
    /// Optional annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: Annotations,
}

impl ImageManifest {
    /// Parse a manifest from its JSON form
    pub fn from_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    /// Every blob descriptor the manifest references, config first
    pub fn blobs(&self) -> impl Iterator<Item = &Descriptor> {
        std::iter::once(&self.config).chain(self.layers.iter())
    }
}
