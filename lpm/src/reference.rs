//! Placeholder descriptors that describe a subject blob without carrying it.

use ociclient::{Annotations, Descriptor, ImageManifest, OciDigest};

use crate::annotations::{
    ANNOTATION_SUBJECT_DIGEST, ANNOTATION_SUBJECT_MEDIA_TYPE, ANNOTATION_SUBJECT_SIZE,
    MEDIA_TYPE_LPM_CONFIG, MEDIA_TYPE_LPM_LAYER, MEDIA_TYPE_LPM_MANIFEST,
};

/// Which part of the reference artifact a descriptor stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Manifest,
    Config,
    Layer,
}

impl ReferenceKind {
    pub fn media_type(self) -> &'static str {
        match self {
            ReferenceKind::Manifest => MEDIA_TYPE_LPM_MANIFEST,
            ReferenceKind::Config => MEDIA_TYPE_LPM_CONFIG,
            ReferenceKind::Layer => MEDIA_TYPE_LPM_LAYER,
        }
    }
}

/// Build the reference descriptor for one classified subject descriptor.
///
/// The subject's annotations are copied, then its media type, digest and size
/// are recorded under the subject identity keys. The descriptor itself points
/// at empty content.
pub fn reference_descriptor(kind: ReferenceKind, subject: &Descriptor) -> Descriptor {
    let mut annotations = subject.annotations.clone();
    annotations.insert(
        ANNOTATION_SUBJECT_MEDIA_TYPE.to_string(),
        subject.media_type.clone(),
    );
    annotations.insert(
        ANNOTATION_SUBJECT_DIGEST.to_string(),
        subject.digest.to_string(),
    );
    annotations.insert(ANNOTATION_SUBJECT_SIZE.to_string(), subject.size.to_string());

    Descriptor {
        media_type: kind.media_type().to_string(),
        digest: OciDigest::empty(),
        size: 0,
        annotations,
    }
}

/// Manifest-level annotations: the subject manifest's own plus its media type.
pub fn reference_manifest_annotations(subject: &ImageManifest) -> Annotations {
    let mut annotations = subject.annotations.clone();
    annotations.insert(
        ANNOTATION_SUBJECT_MEDIA_TYPE.to_string(),
        subject.media_type.clone(),
    );
    annotations
}
