//! Assembles the reference manifest and stages it for publishing.

use std::path::Path;

use bytes::Bytes;
use ociclient::{Descriptor, ImageManifest};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::debug;

use crate::annotations::MEDIA_TYPE_LPM_MANIFEST;
use crate::correlate::correlate;
use crate::dockerfile::{Instruction, parse_file};
use crate::error::{LpmError, Result};
use crate::reference::{ReferenceKind, reference_descriptor, reference_manifest_annotations};
use crate::store::ContentStore;

/// A manifest whose config and layers are empty placeholders carrying only annotations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReferenceManifest {
    manifest: ImageManifest,
}

impl ReferenceManifest {
    pub(crate) fn new(manifest: ImageManifest) -> Self {
        Self { manifest }
    }

    pub fn manifest(&self) -> &ImageManifest {
        &self.manifest
    }

    /// Pretty JSON, tab indented. Annotation keys are sorted, so the output is
    /// the same for the same manifest.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut serializer = Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"\t"));
        self.manifest.serialize(&mut serializer)?;
        Ok(buffer)
    }

    /// Descriptor of the canonical bytes of this manifest.
    pub fn descriptor(&self) -> Result<Descriptor> {
        let content = self.to_canonical_bytes()?;
        Ok(Descriptor::for_content(self.manifest.media_type.clone(), &content))
    }

    /// Put the config, every layer and the manifest itself into `store`,
    /// the manifest under `reference`. Returns the manifest descriptor.
    pub fn stage(&self, store: &mut dyn ContentStore, reference: &str) -> Result<Descriptor> {
        for blob in self.manifest.blobs() {
            store.put(blob, Bytes::new())?;
        }

        let content = Bytes::from(self.to_canonical_bytes()?);
        let descriptor = Descriptor::for_content(self.manifest.media_type.clone(), &content);
        store.store_manifest(reference, &descriptor, content)?;

        debug!(
            reference,
            digest = %descriptor.digest,
            layers = self.manifest.layers.len(),
            "staged reference manifest"
        );
        Ok(descriptor)
    }
}

/// Build the reference manifest from a manifest whose layers are already classified.
pub fn assemble(correlated: &ImageManifest) -> ReferenceManifest {
    let config = reference_descriptor(ReferenceKind::Config, &correlated.config);
    let layers = correlated
        .layers
        .iter()
        .map(|layer| reference_descriptor(ReferenceKind::Layer, layer))
        .collect();

    ReferenceManifest::new(ImageManifest {
        schema_version: correlated.schema_version,
        media_type: MEDIA_TYPE_LPM_MANIFEST.to_string(),
        config,
        layers,
        annotations: reference_manifest_annotations(correlated),
    })
}

/// Correlate `instructions` with `subject` and assemble the reference manifest.
pub fn analyze(instructions: &[Instruction], subject: &ImageManifest) -> ReferenceManifest {
    assemble(&correlate(instructions, subject))
}

/// [`analyze`] a Dockerfile and a subject image manifest read from disk.
pub fn analyze_files(dockerfile: &Path, subject_manifest: &Path) -> Result<ReferenceManifest> {
    let instructions = parse_file(dockerfile)?;

    let path = subject_manifest.display().to_string();
    let data = std::fs::read(subject_manifest).map_err(|source| LpmError::Read {
        path: path.clone(),
        source,
    })?;
    let subject = ImageManifest::from_slice(&data)
        .map_err(|source| LpmError::SubjectManifest { path, source })?;

    Ok(analyze(&instructions, &subject))
}
