use ociclient::image_reference::ImageReferenceError;
use thiserror::Error;

use crate::config_annotate::AnnotationError;
use crate::dockerfile::DockerfileError;
use crate::publish::PublishError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum LpmError {
    #[error(transparent)]
    Dockerfile(#[from] DockerfileError),

    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    #[error("invalid image reference {reference}: {source}")]
    ImageReference {
        reference: String,
        #[source]
        source: ImageReferenceError,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse subject image manifest {path}: {source}")]
    SubjectManifest {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} given without a username")]
    PasswordWithoutUsername(&'static str),

    #[error("username given without a password")]
    UsernameWithoutPassword,

    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("staging failed: {0}")]
    Store(#[from] StoreError),

    #[error("failed to push to {target}: {source}")]
    Publish {
        target: String,
        #[source]
        source: PublishError,
    },
}

pub type Result<T> = std::result::Result<T, LpmError>;
