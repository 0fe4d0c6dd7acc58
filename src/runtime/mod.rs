//! The GWT toolchain a goal runs against: which jars, and which version.

pub mod native;
pub mod repository;
pub mod resolver;
pub mod version;

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

pub use resolver::ArtifactResolver;
pub use version::{Capabilities, VersionTag};

/// Operating-system classifier used by pre-2.0 `gwt-dev` artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Mac,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "macos" => Platform::Mac,
            "windows" => Platform::Windows,
            _ => Platform::Linux,
        }
    }

    pub fn classifier(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Mac => "mac",
            Platform::Windows => "windows",
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

/// A resolved GWT toolchain. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeDescriptor {
    /// `gwt-user`: client library and JRE emulation
    pub user_jar: PathBuf,
    /// `gwt-dev`: compiler, shell and test infrastructure
    pub dev_jar: PathBuf,
    pub servlet_jar: Option<PathBuf>,
    pub version: VersionTag,
    pub raw_version: String,
}

impl RuntimeDescriptor {
    pub fn new(user_jar: PathBuf, dev_jar: PathBuf, raw_version: &str) -> Self {
        Self {
            user_jar,
            dev_jar,
            servlet_jar: None,
            version: VersionTag::from_version(raw_version),
            raw_version: raw_version.to_string(),
        }
    }

    pub fn capabilities(&self) -> &'static Capabilities {
        self.version.capabilities()
    }

    /// Both jars must exist and be readable before anything is launched.
    pub fn validate(&self) -> Result<()> {
        for path in [&self.user_jar, &self.dev_jar] {
            check_readable(path)?;
        }
        Ok(())
    }
}

fn check_readable(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(PipelineError::ArtifactNotFound {
            coordinates: path.display().to_string(),
        });
    }
    File::open(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_platform_classifiers() {
        assert_eq!(Platform::Linux.classifier(), "linux");
        assert_eq!(Platform::Mac.classifier(), "mac");
        assert_eq!(Platform::Windows.classifier(), "windows");
    }

    #[test]
    fn test_descriptor_version_from_raw() {
        let runtime = RuntimeDescriptor::new("u.jar".into(), "d.jar".into(), "1.6.0-fake");
        assert_eq!(runtime.version, VersionTag::OneDotSix);
        assert!(runtime.capabilities().fix_embedded_tomcat_classloader_issue);
    }

    #[test]
    fn test_validate_requires_both_jars() {
        let dir = TempDir::new().unwrap();
        let user = dir.path().join("gwt-user.jar");
        fs::write(&user, "u").unwrap();
        let runtime =
            RuntimeDescriptor::new(user, dir.path().join("gwt-dev.jar"), "2.0.0");

        match runtime.validate() {
            Err(PipelineError::ArtifactNotFound { coordinates }) => {
                assert!(coordinates.ends_with("gwt-dev.jar"));
            }
            other => panic!("Expected ArtifactNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_directories() {
        let dir = TempDir::new().unwrap();
        let runtime = RuntimeDescriptor::new(
            dir.path().to_path_buf(),
            dir.path().to_path_buf(),
            "2.0.0",
        );
        assert!(runtime.validate().is_err());
    }
}
