//! Annotation keys, media types and the two ownership templates.
//!
//! The templates are plain constant arrays. Every caller gets its own
//! [`Annotations`] map from [`Ownership::annotations`], so nothing shared can
//! ever be mutated through a layer's map.

use ociclient::Annotations;

pub const ANNOTATION_SUBJECT_AUTHORS: &str = "io.azurecr.lpm.v1.subject.authors";
pub const ANNOTATION_SUBJECT_URL: &str = "io.azurecr.lpm.v1.subject.url";
pub const ANNOTATION_SUBJECT_SOURCE: &str = "io.azurecr.lpm.v1.subject.source";
pub const ANNOTATION_SUBJECT_VENDOR: &str = "io.azurecr.lpm.v1.subject.vendor";

/// Full text of the Dockerfile instruction a layer came from
pub const ANNOTATION_SUBJECT_DOCKERFILE_COMMAND: &str =
    "io.azurecr.lpm.v1.subject.dockerfile.fullcommand";

pub const ANNOTATION_SUBJECT_MEDIA_TYPE: &str = "io.azurecr.lpm.v1.subject.mediaType";
pub const ANNOTATION_SUBJECT_DIGEST: &str = "io.azurecr.lpm.v1.subject.digest";
pub const ANNOTATION_SUBJECT_SIZE: &str = "io.azurecr.lpm.v1.subject.size";

pub const MEDIA_TYPE_LPM_MANIFEST: &str =
    "application/io.azurecr.distribution.manifest.v2.lpm.v1+json";
pub const MEDIA_TYPE_LPM_CONFIG: &str = "application/io.azurecr.container.image.v1.lpm.v1+json";
pub const MEDIA_TYPE_LPM_LAYER: &str =
    "application/io.azurecr.image.rootfs.diff.tar.gzip.lpm.v1+json";

const OWNERSHIP_KEYS: [&str; 4] = [
    ANNOTATION_SUBJECT_AUTHORS,
    ANNOTATION_SUBJECT_URL,
    ANNOTATION_SUBJECT_SOURCE,
    ANNOTATION_SUBJECT_VENDOR,
];

/// Who a layer (or the manifest and config) belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Inherited unchanged from the base image
    Upstream,
    /// Produced by an instruction of this build
    NonUpstream,
}

impl Ownership {
    pub fn as_str(self) -> &'static str {
        match self {
            Ownership::Upstream => "upstream",
            Ownership::NonUpstream => "non-upstream",
        }
    }

    /// A fresh ownership annotation set for this classification.
    pub fn annotations(self) -> Annotations {
        OWNERSHIP_KEYS
            .iter()
            .map(|key| (key.to_string(), self.as_str().to_string()))
            .collect()
    }

    /// Read a classification back out of an annotation map.
    ///
    /// Returns `None` unless all four ownership keys agree.
    pub fn of(annotations: &Annotations) -> Option<Self> {
        let mut values = OWNERSHIP_KEYS.iter().map(|key| annotations.get(*key));
        let first = values.next()??;
        let ownership = match first.as_str() {
            "upstream" => Ownership::Upstream,
            "non-upstream" => Ownership::NonUpstream,
            _ => return None,
        };
        values
            .all(|v| v.map(String::as_str) == Some(ownership.as_str()))
            .then_some(ownership)
    }
}
