//! Writing a generated manifest out and pushing it to its target.
//!
//! The local output is written before anything is pushed and stays in place
//! when the push fails. Everything that can be validated up front (references,
//! credentials) is checked before the output is created.

use std::future::Future;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use ociclient::{Credentials, ImageReference, OciDigest};
use tracing::{info, warn};

use crate::assemble::ReferenceManifest;
use crate::error::{LpmError, Result};
use crate::publish::{Publisher, ctrl_c, publish_until};
use crate::store::MemoryStore;

pub fn parse_reference(reference: &str) -> Result<ImageReference> {
    ImageReference::from_str(reference).map_err(|source| LpmError::ImageReference {
        reference: reference.to_string(),
        source,
    })
}

/// Pair a username with a password given directly or read from `password_stdin`.
///
/// Either both halves are given or neither is; stdin is only read once the
/// username is known to be there.
pub fn read_credentials(
    username: Option<&str>,
    password: Option<&str>,
    password_stdin: Option<&mut dyn BufRead>,
) -> Result<Option<Credentials>> {
    match (username, password, password_stdin) {
        (None, None, None) => Ok(None),
        (None, Some(_), _) => Err(LpmError::PasswordWithoutUsername("--password")),
        (None, None, Some(_)) => Err(LpmError::PasswordWithoutUsername("--password-stdin")),
        (Some(_), None, None) => Err(LpmError::UsernameWithoutPassword),
        (Some(username), Some(password), _) => Ok(Some(Credentials::new(username, password))),
        (Some(username), None, Some(reader)) => {
            let mut line = String::new();
            reader.read_line(&mut line).map_err(|source| LpmError::Read {
                path: "stdin".to_string(),
                source,
            })?;
            Ok(Some(Credentials::new(
                username,
                line.trim_end_matches(['\r', '\n']),
            )))
        }
    }
}

fn write_output(output: Option<&Path>, content: &[u8]) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content).map_err(|source| LpmError::Write {
                path: path.display().to_string(),
                source,
            })?;
            info!(path = %path.display(), "wrote manifest");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(content)
                .and_then(|()| stdout.flush())
                .map_err(|source| LpmError::Write {
                    path: "stdout".to_string(),
                    source,
                })?;
        }
    }
    Ok(())
}

/// Write `manifest` to `output` (stdout when `None`), then push it to `target`
/// if one is given. Returns the pushed manifest digest.
///
/// A push that runs past `timeout` or is interrupted with Ctrl+C fails.
pub async fn emit(
    manifest: &ReferenceManifest,
    output: Option<&Path>,
    target: Option<&str>,
    publisher: &dyn Publisher,
    timeout: Duration,
) -> Result<Option<OciDigest>> {
    emit_until(manifest, output, target, publisher, timeout, ctrl_c()).await
}

/// [`emit`], with the push abandoned once `cancel` resolves.
pub async fn emit_until<C>(
    manifest: &ReferenceManifest,
    output: Option<&Path>,
    target: Option<&str>,
    publisher: &dyn Publisher,
    timeout: Duration,
    cancel: C,
) -> Result<Option<OciDigest>>
where
    C: Future<Output = ()>,
{
    let target = target.map(parse_reference).transpose()?;
    let content = manifest.to_canonical_bytes()?;

    write_output(output, &content)?;

    let Some(target) = target else {
        return Ok(None);
    };

    let mut store = MemoryStore::new();
    manifest.stage(&mut store, &target.to_string())?;

    info!("Pushing to '{}'...", target);
    match publish_until(publisher, &store, &target, timeout, cancel).await {
        Ok(digest) => {
            info!("Pushed to '{}' with digest '{}'", target, digest);
            Ok(Some(digest))
        }
        Err(source) => {
            if let Some(path) = output {
                warn!(path = %path.display(), "push failed; the local manifest was kept");
            }
            Err(LpmError::Publish {
                target: target.to_string(),
                source,
            })
        }
    }
}
