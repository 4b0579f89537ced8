//! Manifests that carry only caller supplied config annotations, e.g.
//! end-of-life notices attached to an image.

use ociclient::{Annotations, Descriptor, ImageManifest, OciDigest};
use thiserror::Error;
use tracing::info;

use crate::assemble::ReferenceManifest;
use crate::error::LpmError;

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("invalid annotation: {0} (expected \"key: value\")")]
    MissingSeparator(String),

    #[error("invalid annotation: {0} (empty key)")]
    EmptyKey(String),
}

/// Split `"key: value"` at the first colon; whitespace after the colon is dropped.
pub fn parse_annotation(raw: &str) -> Result<(String, String), AnnotationError> {
    let (key, value) = raw
        .split_once(':')
        .ok_or_else(|| AnnotationError::MissingSeparator(raw.to_string()))?;
    if key.is_empty() {
        return Err(AnnotationError::EmptyKey(raw.to_string()));
    }
    Ok((key.to_string(), value.trim_start().to_string()))
}

/// Parse every entry; the first malformed one aborts.
pub fn parse_annotations<S: AsRef<str>>(raw: &[S]) -> Result<Annotations, AnnotationError> {
    let mut annotations = Annotations::new();
    for entry in raw {
        let (key, value) = parse_annotation(entry.as_ref())?;
        info!("annotation: '{}: {}'", key, value);
        annotations.insert(key, value);
    }
    Ok(annotations)
}

/// A layerless manifest whose config descriptor holds `annotations`.
pub fn config_annotation_manifest(
    manifest_media_type: &str,
    config_media_type: &str,
    annotations: Annotations,
) -> ReferenceManifest {
    ReferenceManifest::new(ImageManifest {
        schema_version: 2,
        media_type: manifest_media_type.to_string(),
        config: Descriptor {
            media_type: config_media_type.to_string(),
            digest: OciDigest::empty(),
            size: 0,
            annotations,
        },
        layers: Vec::new(),
        annotations: Annotations::new(),
    })
}

/// Parse `entries` and build the config annotation manifest from them.
pub fn annotate_config<S: AsRef<str>>(
    manifest_media_type: &str,
    config_media_type: &str,
    entries: &[S],
) -> Result<ReferenceManifest, LpmError> {
    let annotations = parse_annotations(entries)?;
    Ok(config_annotation_manifest(
        manifest_media_type,
        config_media_type,
        annotations,
    ))
}
