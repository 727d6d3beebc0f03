//! Per-request artifact storage
//!
//! Each request owns `<work_dir>/<request id>/`. Artifact names are fixed
//! per role, so concurrent uploads never collide no matter what filename the
//! client sends. The workspace removes its artifacts and directory when
//! cleaned up or dropped.

use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;
use vct_common::uuid_utils;

use crate::error::ServiceError;

/// Longest extension kept from the client filename
const MAX_EXTENSION_LEN: usize = 8;

/// Upload as received: untrusted filename plus body stream
pub struct UploadedAudio<R> {
    pub file_name: Option<String>,
    pub body: R,
}

impl<R> UploadedAudio<R> {
    pub fn new(file_name: Option<String>, body: R) -> Self {
        Self { file_name, body }
    }
}

/// Artifact role tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactRole {
    /// Upload as received
    Original,
    /// 16 kHz mono WAV
    Converted,
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactRole::Original => f.write_str("original"),
            ArtifactRole::Converted => f.write_str("converted"),
        }
    }
}

/// A file created on behalf of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporaryArtifact {
    pub path: PathBuf,
    pub role: ArtifactRole,
}

/// Sanitized extension of a client filename, if it has a usable one
///
/// Only short ASCII-alphanumeric extensions survive; the converter probes
/// content anyway, the extension is a hint.
pub fn sanitized_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?;
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Working directory and artifacts of one request
#[derive(Debug)]
pub struct RequestWorkspace {
    request_id: Uuid,
    dir: PathBuf,
    artifacts: Vec<TemporaryArtifact>,
    cleaned: bool,
}

impl RequestWorkspace {
    /// No filesystem access until the first artifact is written
    pub fn new(work_dir: &Path, request_id: Uuid) -> Self {
        Self {
            request_id,
            dir: work_dir.join(uuid_utils::to_simple(&request_id)),
            artifacts: Vec::new(),
            cleaned: false,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifacts(&self) -> &[TemporaryArtifact] {
        &self.artifacts
    }

    /// Register the artifact for `role` before anything writes to it
    ///
    /// Registration comes first so a partially written file is still removed.
    pub fn allocate(&mut self, role: ArtifactRole, extension: Option<&str>) -> PathBuf {
        let file_name = match extension {
            Some(ext) => format!("{}.{}", role, ext),
            None => role.to_string(),
        };
        let path = self.dir.join(file_name);
        self.artifacts.push(TemporaryArtifact {
            path: path.clone(),
            role,
        });
        path
    }

    /// Ingest stage: stream the upload into the `original` artifact
    ///
    /// On success the file length equals the number of bytes read.
    pub async fn ingest<R>(&mut self, upload: UploadedAudio<R>) -> Result<PathBuf, ServiceError>
    where
        R: AsyncRead + Unpin,
    {
        let UploadedAudio {
            file_name,
            mut body,
        } = upload;

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            ServiceError::Storage(format!("cannot create working directory: {}", e))
        })?;

        let extension = file_name.as_deref().and_then(sanitized_extension);
        let path = self.allocate(ArtifactRole::Original, extension.as_deref());

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| ServiceError::Storage(format!("cannot create upload file: {}", e)))?;

        let copied = tokio::io::copy(&mut body, &mut file)
            .await
            .map_err(|e| ServiceError::Storage(format!("saving upload failed: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| ServiceError::Storage(format!("saving upload failed: {}", e)))?;
        drop(file);

        let written = tokio::fs::metadata(&path)
            .await
            .map_err(|e| ServiceError::Storage(format!("cannot stat upload file: {}", e)))?
            .len();
        if written != copied {
            return Err(ServiceError::Storage(format!(
                "incomplete write: read {} bytes, stored {}",
                copied, written
            )));
        }

        debug!(
            client_file_name = file_name.as_deref().unwrap_or(""),
            bytes = copied,
            path = %path.display(),
            "Upload stored"
        );
        Ok(path)
    }

    /// Remove every artifact and the request directory
    ///
    /// Best-effort and idempotent; failures are logged, never returned.
    /// Returns the number of artifacts removed.
    pub async fn cleanup(&mut self) -> usize {
        if self.cleaned {
            return 0;
        }
        self.cleaned = true;

        let mut removed = 0;
        for artifact in std::mem::take(&mut self.artifacts) {
            match tokio::fs::remove_file(&artifact.path).await {
                Ok(()) => removed += 1,
                Err(e) => self.removal_failed(Some(&artifact), e),
            }
        }

        // Also catches anything a tool left behind next to our artifacts
        if let Err(e) = tokio::fs::remove_dir_all(&self.dir).await {
            self.removal_failed(None, e);
        }

        removed
    }

    /// Synchronous variant for `Drop`, where nothing can be awaited
    fn cleanup_blocking(&mut self) -> usize {
        if self.cleaned {
            return 0;
        }
        self.cleaned = true;

        let mut removed = 0;
        for artifact in std::mem::take(&mut self.artifacts) {
            match std::fs::remove_file(&artifact.path) {
                Ok(()) => removed += 1,
                Err(e) => self.removal_failed(Some(&artifact), e),
            }
        }

        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            self.removal_failed(None, e);
        }

        removed
    }

    fn removal_failed(&self, artifact: Option<&TemporaryArtifact>, e: std::io::Error) {
        if e.kind() == std::io::ErrorKind::NotFound {
            return;
        }
        match artifact {
            Some(artifact) => warn!(
                request_id = %self.request_id,
                role = %artifact.role,
                path = %artifact.path.display(),
                "Failed to remove artifact: {}",
                e
            ),
            None => warn!(
                request_id = %self.request_id,
                dir = %self.dir.display(),
                "Failed to remove working directory: {}",
                e
            ),
        }
    }
}

impl Drop for RequestWorkspace {
    fn drop(&mut self) {
        let removed = self.cleanup_blocking();
        if removed > 0 {
            debug!(request_id = %self.request_id, removed, "Artifacts removed on drop");
        }
    }
}
