use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap};
use reqwest::{Client as ReqwestClient, Method, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::digest::{DigestError, OciDigest};
use crate::models::{DOCKER_MANIFEST_V2_MEDIA_TYPE, Descriptor, ImageManifest, OCI_IMAGE_MANIFEST_MEDIA_TYPE};

/// Error type for registry operations
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Unexpected response while trying to {action}: {status} - {body}")]
    UnexpectedStatus {
        action: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("Malformed response header: {0}")]
    MalformedHeader(String),
    #[error("Invalid digest: {0}")]
    Digest(#[from] DigestError),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Username and password used against a registry
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Value for a `Basic` authorization header
    fn basic(&self) -> String {
        BASE64.encode(format!("{}:{}", self.username, self.password))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A client for interacting with an OCI registry.
pub struct Client {
    registry_url: String,
    auth: Option<String>,
    client: ReqwestClient,
}

impl Client {
    /// Create a new client for the given registry URL.
    pub fn new(registry_url: String, credentials: Option<Credentials>) -> Self {
        Self {
            registry_url: registry_url.trim_end_matches('/').to_string(),
            auth: credentials.as_ref().map(Credentials::basic),
            client: ReqwestClient::new(),
        }
    }

    /// Create a new session for the given repository.
    pub fn new_session(&self, repository: String) -> ClientSession {
        ClientSession {
            repository,
            registry_url: self.registry_url.clone(),
            client: self.client.clone(),
            auth: self.auth.clone(),
            token: None,
        }
    }
}

// Token authentication response from the auth service
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(alias = "access_token")]
    token: String,
}

/// Parameters of a `WWW-Authenticate: Bearer ...` challenge
#[derive(Debug, Default, PartialEq, Eq)]
struct BearerChallenge {
    realm: Option<String>,
    service: Option<String>,
    scope: Option<String>,
}

impl BearerChallenge {
    fn parse(header_value: &str) -> Option<Self> {
        let params = header_value.strip_prefix("Bearer ")?;
        let mut challenge = BearerChallenge::default();

        // scope values may themselves contain commas ("pull,push"), so split on `,key=`
        let mut rest = params.trim();
        while !rest.is_empty() {
            let eq_pos = rest.find('=')?;
            let key = rest[..eq_pos].trim();
            let after = &rest[eq_pos + 1..];
            let (value, next) = if let Some(quoted) = after.strip_prefix('"') {
                let end = quoted.find('"')?;
                (&quoted[..end], quoted[end + 1..].trim_start_matches(',').trim())
            } else {
                match after.find(',') {
                    Some(comma) => (&after[..comma], after[comma + 1..].trim()),
                    None => (after, ""),
                }
            };

            match key {
                "realm" => challenge.realm = Some(value.to_string()),
                "service" => challenge.service = Some(value.to_string()),
                "scope" => challenge.scope = Some(value.to_string()),
                _ => {}
            }
            rest = next;
        }

        Some(challenge)
    }
}

/// A session for interacting with a specific repository in an OCI registry.
pub struct ClientSession {
    repository: String,
    registry_url: String,
    client: ReqwestClient,
    auth: Option<String>,
    token: Option<String>,
}

impl ClientSession {
    pub fn repository(&self) -> &str {
        &self.repository
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.header(header::AUTHORIZATION, format!("Bearer {}", token))
        } else if let Some(auth) = &self.auth {
            request.header(header::AUTHORIZATION, format!("Basic {}", auth))
        } else {
            request
        }
    }

    /// Obtain a bearer token for the challenge carried by a 401 response.
    async fn fetch_token(&mut self, headers: &HeaderMap) -> Result<bool> {
        let Some(auth_header) = headers.get(header::WWW_AUTHENTICATE) else {
            return Ok(false);
        };
        let auth_header = auth_header
            .to_str()
            .map_err(|e| ClientError::MalformedHeader(e.to_string()))?;
        let Some(challenge) = BearerChallenge::parse(auth_header) else {
            return Ok(false);
        };
        let Some(realm) = challenge.realm else {
            return Ok(false);
        };

        let mut token_url = reqwest::Url::parse(&realm)
            .map_err(|e| ClientError::MalformedHeader(format!("realm {}: {}", realm, e)))?;
        if let Some(service) = challenge.service {
            token_url.query_pairs_mut().append_pair("service", &service);
        }
        if let Some(scope) = challenge.scope {
            token_url.query_pairs_mut().append_pair("scope", &scope);
        }

        let mut token_request = self.client.get(token_url);
        if let Some(auth) = &self.auth {
            token_request = token_request.header(header::AUTHORIZATION, format!("Basic {}", auth));
        }

        let token_response = token_request.send().await?;
        if !token_response.status().is_success() {
            return Err(ClientError::Unauthorized(format!(
                "token request to {} failed: {}",
                realm,
                token_response.status()
            )));
        }

        let token_data: TokenResponse = token_response.json().await?;
        debug!(repository = %self.repository, "obtained bearer token");
        self.token = Some(token_data.token);
        Ok(true)
    }

    /// Send a request, retrying once with a bearer token if the registry asks for one.
    async fn send(
        &mut self,
        method: Method,
        url: &str,
        content_type: Option<&str>,
        body: Option<Bytes>,
    ) -> Result<reqwest::Response> {
        let build = |session: &Self| {
            let mut request = session.client.request(method.clone(), url);
            if let Some(content_type) = content_type {
                request = request.header(header::CONTENT_TYPE, content_type);
            }
            if method == Method::GET {
                request = request.header(
                    header::ACCEPT,
                    format!("{}, {}", OCI_IMAGE_MANIFEST_MEDIA_TYPE, DOCKER_MANIFEST_V2_MEDIA_TYPE),
                );
            }
            if let Some(body) = &body {
                request = request.body(body.clone());
            }
            session.authorize(request)
        };

        let response = build(&*self).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        if !self.fetch_token(response.headers()).await? {
            return Err(ClientError::Unauthorized(format!("{} {}", method, url)));
        }

        let retried = build(&*self).send().await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized(format!("{} {}", method, url)));
        }
        Ok(retried)
    }

    async fn unexpected(action: &'static str, response: reqwest::Response) -> ClientError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        ClientError::UnexpectedStatus {
            action,
            status,
            body,
        }
    }

    /// Check if a blob with the given digest exists.
    pub async fn blob_exists(&mut self, digest: &OciDigest) -> Result<bool> {
        let url = format!("{}/v2/{}/blobs/{}", self.registry_url, self.repository, digest);
        let response = self.send(Method::HEAD, &url, None, None).await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::unexpected("check blob", response).await),
        }
    }

    /// Upload content from a byte slice as a single monolithic upload.
    pub async fn upload_bytes(&mut self, media_type: String, content: Bytes) -> Result<Descriptor> {
        let descriptor = Descriptor::for_content(media_type, &content);

        let start_url = format!("{}/v2/{}/blobs/uploads/", self.registry_url, self.repository);
        debug!(url = %start_url, digest = %descriptor.digest, "starting blob upload");
        let start_response = self.send(Method::POST, &start_url, None, None).await?;
        if start_response.status() != StatusCode::ACCEPTED {
            return Err(Self::unexpected("start upload", start_response).await);
        }

        let location = start_response
            .headers()
            .get(header::LOCATION)
            .ok_or_else(|| ClientError::MalformedHeader("no location header in response".to_string()))?
            .to_str()
            .map_err(|e| ClientError::MalformedHeader(e.to_string()))?;

        let upload_url = if location.starts_with("http") {
            location.to_string()
        } else {
            format!("{}{}", self.registry_url, location)
        };
        let separator = if upload_url.contains('?') { '&' } else { '?' };
        let complete_url = format!("{}{}digest={}", upload_url, separator, descriptor.digest);

        let complete_response = self
            .send(
                Method::PUT,
                &complete_url,
                Some("application/octet-stream"),
                Some(content),
            )
            .await?;
        if complete_response.status() != StatusCode::CREATED {
            return Err(Self::unexpected("complete upload", complete_response).await);
        }

        Ok(descriptor)
    }

    /// Store manifest bytes under a tag or digest and return the digest the registry reports.
    pub async fn put_manifest(
        &mut self,
        reference: &str,
        media_type: &str,
        manifest: Bytes,
    ) -> Result<OciDigest> {
        let local_digest = OciDigest::from_bytes(&manifest);
        let url = format!("{}/v2/{}/manifests/{}", self.registry_url, self.repository, reference);
        let response = self
            .send(Method::PUT, &url, Some(media_type), Some(manifest))
            .await?;

        if response.status() != StatusCode::CREATED && response.status() != StatusCode::OK {
            return Err(Self::unexpected("register manifest", response).await);
        }

        match response.headers().get("docker-content-digest") {
            Some(value) => {
                let value = value
                    .to_str()
                    .map_err(|e| ClientError::MalformedHeader(e.to_string()))?;
                Ok(OciDigest::from_str(value)?)
            }
            None => Ok(local_digest),
        }
    }

    /// Query a manifest with the given reference.
    pub async fn fetch_manifest(&mut self, reference: &str) -> Result<Option<ImageManifest>> {
        let url = format!("{}/v2/{}/manifests/{}", self.registry_url, self.repository, reference);
        let response = self.send(Method::GET, &url, None, None).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if response.status() != StatusCode::OK {
            return Err(Self::unexpected("query manifest", response).await);
        }

        let data = response.bytes().await?;
        Ok(Some(ImageManifest::from_slice(&data)?))
    }
}
