//! Copies a staged reference artifact to a registry.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use ociclient::{Client, ClientError, Credentials, ImageManifest, ImageReference, OciDigest};
use thiserror::Error;
use tracing::{debug, info};

use crate::store::ContentStore;

const DOCKER_HUB: &str = "docker.io";
const DOCKER_HUB_REGISTRY: &str = "registry-1.docker.io";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("nothing staged under {0}")]
    NotStaged(String),

    #[error("staged content {0} is missing")]
    MissingBlob(OciDigest),

    #[error("staged manifest is not valid: {0}")]
    InvalidManifest(#[from] serde_json::Error),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("push did not finish within {0:?}")]
    TimedOut(Duration),

    #[error("push cancelled")]
    Cancelled,
}

/// Something that can take a staged artifact and store it elsewhere
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Copy the manifest staged under `reference` in `source`, and everything
    /// it references, to the destination. Returns the pushed manifest digest.
    async fn copy(
        &self,
        source: &dyn ContentStore,
        reference: &ImageReference,
    ) -> Result<OciDigest, PublishError>;
}

/// Connection settings for [`RegistryPublisher`]
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Talk http instead of https
    pub plain_http: bool,
    /// Registry used for references without a hostname
    pub default_registry: String,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            plain_http: false,
            default_registry: DOCKER_HUB.to_string(),
        }
    }
}

/// [`Publisher`] that pushes to an OCI distribution registry
#[derive(Debug)]
pub struct RegistryPublisher {
    credentials: Option<Credentials>,
    settings: RegistrySettings,
}

impl RegistryPublisher {
    pub fn new(credentials: Option<Credentials>, settings: RegistrySettings) -> Self {
        Self {
            credentials,
            settings,
        }
    }

    /// Registry base URL and repository path for `reference`.
    fn endpoint(&self, reference: &ImageReference) -> (String, String) {
        let registry = reference.registry(&self.settings.default_registry);
        let scheme = if self.settings.plain_http { "http" } else { "https" };

        if registry == DOCKER_HUB {
            let repository = if reference.name.contains('/') {
                reference.name.clone()
            } else {
                format!("library/{}", reference.name)
            };
            (format!("{}://{}", scheme, DOCKER_HUB_REGISTRY), repository)
        } else {
            (format!("{}://{}", scheme, registry), reference.name.clone())
        }
    }
}

#[async_trait]
impl Publisher for RegistryPublisher {
    async fn copy(
        &self,
        source: &dyn ContentStore,
        reference: &ImageReference,
    ) -> Result<OciDigest, PublishError> {
        let name = reference.to_string();
        let manifest_descriptor = source
            .resolve(&name)
            .ok_or_else(|| PublishError::NotStaged(name.clone()))?;
        let manifest_bytes = source
            .fetch(&manifest_descriptor.digest)
            .ok_or_else(|| PublishError::MissingBlob(manifest_descriptor.digest.clone()))?;
        let manifest = ImageManifest::from_slice(&manifest_bytes)?;

        let (registry_url, repository) = self.endpoint(reference);
        let client = Client::new(registry_url.clone(), self.credentials.clone());
        let mut session = client.new_session(repository);

        let mut seen = HashSet::new();
        for blob in manifest.blobs() {
            if !seen.insert(blob.digest.clone()) {
                continue;
            }
            if session.blob_exists(&blob.digest).await? {
                debug!(digest = %blob.digest, "blob already present in registry");
                continue;
            }
            let content = source
                .fetch(&blob.digest)
                .ok_or_else(|| PublishError::MissingBlob(blob.digest.clone()))?;
            session.upload_bytes(blob.media_type.clone(), content).await?;
            debug!(digest = %blob.digest, "uploaded blob");
        }

        let pushed = session
            .put_manifest(
                &reference.reference.to_string(),
                &manifest_descriptor.media_type,
                manifest_bytes,
            )
            .await?;

        info!(
            registry = %registry_url,
            repository = session.repository(),
            digest = %pushed,
            "pushed reference manifest"
        );
        Ok(pushed)
    }
}

/// Run `publisher.copy`, giving up after `timeout` or once `cancel` resolves.
///
/// An abandoned push is dropped mid-flight; whatever reached the registry stays there.
pub async fn publish_until<C>(
    publisher: &dyn Publisher,
    source: &dyn ContentStore,
    reference: &ImageReference,
    timeout: Duration,
    cancel: C,
) -> Result<OciDigest, PublishError>
where
    C: Future<Output = ()>,
{
    tokio::select! {
        result = tokio::time::timeout(timeout, publisher.copy(source, reference)) => {
            result.unwrap_or(Err(PublishError::TimedOut(timeout)))
        }
        _ = cancel => Err(PublishError::Cancelled),
    }
}

/// [`publish_until`] cancelled by Ctrl+C.
pub async fn publish_with_timeout(
    publisher: &dyn Publisher,
    source: &dyn ContentStore,
    reference: &ImageReference,
    timeout: Duration,
) -> Result<OciDigest, PublishError> {
    publish_until(publisher, source, reference, timeout, ctrl_c()).await
}

pub(crate) async fn ctrl_c() {
    // Without a handler there is nothing to wait for
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
