//! Maven-2 layout artifact repository: a local directory, optionally backed
//! by a remote HTTP repository.

use crate::error::{PipelineError, Result};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_REMOTE_REPOSITORY: &str = "https://repo1.maven.org/maven2";
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ArtifactCoordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub extension: String,
}

impl ArtifactCoordinates {
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            classifier: None,
            extension: "jar".to_string(),
        }
    }

    pub fn with_classifier(mut self, classifier: &str) -> Self {
        self.classifier = Some(classifier.to_string());
        self
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.to_string();
        self
    }

    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(c) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, c, self.extension
            ),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.extension),
        }
    }

    /// Path relative to a repository root, `/`-separated
    pub fn repository_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.version,
            self.file_name()
        )
    }
}

impl fmt::Display for ArtifactCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if let Some(c) = &self.classifier {
            write!(f, ":{}", c)?;
        }
        if self.extension != "jar" {
            write!(f, "@{}", self.extension)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Repository {
    local: PathBuf,
    remote: Option<String>,
}

impl Repository {
    pub fn new(local: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            remote: Some(remote.into()),
        }
    }

    /// A repository that never touches the network
    pub fn offline(local: impl Into<PathBuf>) -> Self {
        Self {
            local: local.into(),
            remote: None,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.remote.is_none()
    }

    pub fn locate(&self, coords: &ArtifactCoordinates) -> PathBuf {
        self.local.join(coords.repository_path())
    }

    /// Local path of the artifact, downloading it first when missing.
    pub fn resolve(&self, coords: &ArtifactCoordinates) -> Result<PathBuf> {
        let path = self.locate(coords);
        if path.is_file() {
            debug!(artifact = %coords, path = %path.display(), "Artifact found in local repository");
            return Ok(path);
        }
        if self.remote.is_none() {
            return Err(PipelineError::ArtifactNotFound {
                coordinates: coords.to_string(),
            });
        }
        self.fetch(coords)
    }

    fn fetch(&self, coords: &ArtifactCoordinates) -> Result<PathBuf> {
        let remote = self.remote.as_deref().ok_or_else(|| PipelineError::ArtifactNotFound {
            coordinates: coords.to_string(),
        })?;
        let url = format!(
            "{}/{}",
            remote.trim_end_matches('/'),
            coords.repository_path()
        );
        info!(artifact = %coords, url = %url, "Downloading artifact");

        let client = reqwest::blocking::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| PipelineError::resolution(coords.to_string(), e))?;

        let response = client
            .get(&url)
            .send()
            .map_err(|e| PipelineError::resolution(coords.to_string(), e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PipelineError::ArtifactNotFound {
                coordinates: coords.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(PipelineError::resolution(
                coords.to_string(),
                format!("HTTP {} from {}", response.status(), url),
            ));
        }

        let bytes = response
            .bytes()
            .map_err(|e| PipelineError::resolution(coords.to_string(), e))?;
        if bytes.is_empty() {
            return Err(PipelineError::resolution(
                coords.to_string(),
                format!("empty response from {}", url),
            ));
        }

        verify_checksum(&client, &url, &bytes, coords)?;

        let path = self.locate(coords);
        write_atomically(&path, &bytes)?;
        info!(artifact = %coords, bytes = bytes.len(), "Artifact stored in local repository");
        Ok(path)
    }
}

/// Compare against the `.md5` sidecar when the remote publishes one.
fn verify_checksum(
    client: &reqwest::blocking::Client,
    url: &str,
    bytes: &[u8],
    coords: &ArtifactCoordinates,
) -> Result<()> {
    let sidecar = format!("{}.md5", url);
    let expected = match client.get(&sidecar).send() {
        Ok(resp) if resp.status().is_success() => match resp.text() {
            Ok(text) => parse_checksum(&text),
            Err(_) => None,
        },
        Ok(resp) => {
            debug!(url = %sidecar, status = %resp.status(), "No checksum published");
            None
        }
        Err(e) => {
            warn!(url = %sidecar, error = %e, "Could not fetch checksum, skipping verification");
            None
        }
    };

    if let Some(expected) = expected {
        let actual = format!("{:x}", md5::compute(bytes));
        if !actual.eq_ignore_ascii_case(&expected) {
            return Err(PipelineError::resolution(
                coords.to_string(),
                format!("checksum mismatch: expected {}, got {}", expected, actual),
            ));
        }
        debug!(artifact = %coords, "Checksum verified");
    }
    Ok(())
}

/// First token of a checksum file (`<hex>` or `<hex>  <file name>`)
pub(crate) fn parse_checksum(text: &str) -> Option<String> {
    text.split_whitespace()
        .next()
        .filter(|token| token.len() == 32 && token.chars().all(|c| c.is_ascii_hexdigit()))
        .map(|token| token.to_ascii_lowercase())
}

/// Sibling `<name>.part` path that downloads and extractions are staged in
pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut partial = path.as_os_str().to_os_string();
    partial.push(".part");
    PathBuf::from(partial)
}

/// Remove a staged file after a failed write, logging rather than masking the original error.
pub(crate) fn discard_partial(partial: &Path) {
    if let Err(e) = fs::remove_file(partial) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %partial.display(), error = %e, "Could not remove partial file");
        }
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let partial = partial_path(path);
    if let Err(e) = fs::write(&partial, bytes).and_then(|_| fs::rename(&partial, path)) {
        discard_partial(&partial);
        return Err(e.into());
    }
    Ok(())
}
