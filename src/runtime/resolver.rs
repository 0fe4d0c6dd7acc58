//! Finding the GWT jars: a local installation, an explicit version, or the
//! version the project itself declares.

use super::native::unpack_native_payload;
use super::repository::{ArtifactCoordinates, Repository};
use super::{Platform, RuntimeDescriptor, VersionTag};
use crate::error::{PipelineError, Result};
use crate::project::ProjectModel;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const GWT_GROUP_ID: &str = "com.google.gwt";
pub const GWT_USER: &str = "gwt-user";
pub const GWT_DEV: &str = "gwt-dev";
pub const GWT_SERVLET: &str = "gwt-servlet";

pub struct ArtifactResolver<'a> {
    repository: &'a Repository,
    platform: Platform,
}

impl<'a> ArtifactResolver<'a> {
    pub fn new(repository: &'a Repository, platform: Platform) -> Self {
        Self {
            repository,
            platform,
        }
    }

    /// Resolve the toolchain, in priority order: `home`, then `version`,
    /// then the `gwt-user` version declared by `project`.
    pub fn resolve(
        &self,
        home: Option<&Path>,
        version: Option<&str>,
        project: Option<&ProjectModel>,
    ) -> Result<RuntimeDescriptor> {
        if let Some(home) = home {
            return self.from_home(home, version);
        }

        let raw_version = match version {
            Some(v) => v.to_string(),
            None => project
                .and_then(detect_project_version)
                .ok_or_else(|| {
                    warn!(
                        "No GWT version configured and no {}:{} dependency declared",
                        GWT_GROUP_ID, GWT_USER
                    );
                    PipelineError::Configuration(format!(
                        "Cannot determine GWT version: set gwt-version or gwt-home, \
                         or declare a {}:{} dependency",
                        GWT_GROUP_ID, GWT_USER
                    ))
                })?,
        };

        self.from_repository(&raw_version)
    }

    fn from_home(&self, home: &Path, version: Option<&str>) -> Result<RuntimeDescriptor> {
        if !home.is_dir() {
            return Err(PipelineError::InvalidHome {
                path: home.to_path_buf(),
                missing: "(directory)".to_string(),
            });
        }

        let user_jar = home.join("gwt-user.jar");
        if !user_jar.is_file() {
            return Err(PipelineError::InvalidHome {
                path: home.to_path_buf(),
                missing: "gwt-user.jar".to_string(),
            });
        }

        let dev_candidates = [
            "gwt-dev.jar".to_string(),
            format!("gwt-dev-{}.jar", self.platform.classifier()),
        ];
        let dev_jar = dev_candidates
            .iter()
            .map(|name| home.join(name))
            .find(|p| p.is_file())
            .ok_or_else(|| PipelineError::InvalidHome {
                path: home.to_path_buf(),
                missing: dev_candidates.join(" or "),
            })?;

        let raw_version = version
            .map(str::to_string)
            .or_else(|| version_from_about(home))
            .unwrap_or_else(|| "unknown".to_string());

        let mut runtime = RuntimeDescriptor::new(user_jar, dev_jar, &raw_version);
        let servlet = home.join("gwt-servlet.jar");
        runtime.servlet_jar = servlet.is_file().then_some(servlet);

        info!(
            home = %home.display(),
            version = %runtime.raw_version,
            bucket = %runtime.version,
            "Using local GWT installation"
        );
        runtime.validate()?;
        Ok(runtime)
    }

    fn from_repository(&self, raw_version: &str) -> Result<RuntimeDescriptor> {
        let tag = VersionTag::from_version(raw_version);
        let caps = tag.capabilities();

        let user_jar = self
            .repository
            .resolve(&ArtifactCoordinates::new(GWT_GROUP_ID, GWT_USER, raw_version))?;

        let mut dev_coords = ArtifactCoordinates::new(GWT_GROUP_ID, GWT_DEV, raw_version);
        if caps.platform_classified_dev {
            dev_coords = dev_coords.with_classifier(self.platform.classifier());
        }
        let dev_jar = self.repository.resolve(&dev_coords)?;

        if caps.platform_classified_dev {
            self.unpack_natives(raw_version, &dev_jar)?;
        }

        let mut runtime = RuntimeDescriptor::new(user_jar, dev_jar, raw_version);
        runtime.servlet_jar = self
            .repository
            .resolve(&ArtifactCoordinates::new(GWT_GROUP_ID, GWT_SERVLET, raw_version))
            .map_err(|e| debug!(error = %e, "gwt-servlet not available"))
            .ok();

        info!(version = %raw_version, bucket = %tag, "Resolved GWT from repository");
        runtime.validate()?;
        Ok(runtime)
    }

    fn unpack_natives(&self, raw_version: &str, dev_jar: &Path) -> Result<()> {
        let coords = ArtifactCoordinates::new(GWT_GROUP_ID, GWT_DEV, raw_version)
            .with_classifier(&format!("{}-libs", self.platform.classifier()))
            .with_extension("zip");

        let archive = match self.repository.resolve(&coords) {
            Ok(path) => path,
            Err(PipelineError::ArtifactNotFound { .. }) => {
                warn!(artifact = %coords, "No native library bundle published, continuing without it");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let target = dev_jar
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        unpack_native_payload(&archive, &target)?;
        Ok(())
    }
}

/// The `gwt-user` version the project declares, directly or through
/// dependency management
pub fn detect_project_version(project: &ProjectModel) -> Option<String> {
    project
        .find_dependency_version(GWT_GROUP_ID, GWT_USER)
        .filter(|v| !v.contains("${"))
        .map(str::to_string)
}

/// `about.txt` in a GWT distribution starts with `Google Web Toolkit <version>`
fn version_from_about(home: &Path) -> Option<String> {
    let about = fs::read_to_string(home.join("about.txt")).ok()?;
    let first = about.lines().next()?;
    first
        .split_whitespace()
        .last()
        .filter(|token| token.chars().next().is_some_and(|c| c.is_ascii_digit()))
        .map(str::to_string)
}
