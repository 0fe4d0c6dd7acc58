//! Timestamp-based freshness check for compiled modules.
//!
//! This is a heuristic: it compares modification times, not content, and it
//! does not notice dependency version changes.

use crate::error::Result;
use crate::module::ModuleDescriptor;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Suffixes of inputs that can change a module's compiled output
pub const TRACKED_SUFFIXES: &[&str] = &[
    ".java",
    ".gwt.xml",
    ".ui.xml",
    ".xml",
    ".properties",
    ".css",
    ".html",
    ".js",
    ".png",
    ".gif",
    ".jpg",
];

#[derive(Debug, Clone)]
pub struct StalenessChecker {
    roots: Vec<PathBuf>,
    force: bool,
}

impl StalenessChecker {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            force: false,
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// `<output_root>/<name>/<name>.nocache.js`
    pub fn expected_output(module: &ModuleDescriptor, output_root: &Path) -> PathBuf {
        let name = module.output_name();
        output_root.join(name).join(format!("{}.nocache.js", name))
    }

    pub fn is_recompilation_required(
        &self,
        module: &ModuleDescriptor,
        output_root: &Path,
    ) -> Result<bool> {
        // Library modules are never compile targets, forced or not
        if module.is_library() {
            debug!(module = %module.qualified_name, "Library module, nothing to compile");
            return Ok(false);
        }
        if self.force {
            return Ok(true);
        }

        let output = Self::expected_output(module, output_root);
        let output_time = match fs::metadata(&output) {
            Ok(meta) => meta.modified()?,
            Err(_) => {
                debug!(output = %output.display(), "Compiled output missing");
                return Ok(true);
            }
        };

        if let Some(newer) = self.find_newer_input(output_time)? {
            info!(
                module = %module.qualified_name,
                changed = %newer.display(),
                "Sources changed since last compile"
            );
            return Ok(true);
        }

        debug!(module = %module.qualified_name, "Compiled output is up to date");
        Ok(false)
    }

    fn find_newer_input(&self, threshold: SystemTime) -> Result<Option<PathBuf>> {
        for root in self.roots.iter().filter(|r| r.is_dir()) {
            for entry in WalkDir::new(root) {
                let entry = entry.map_err(std::io::Error::from)?;
                if !entry.file_type().is_file() || !self.is_tracked(entry.path()) {
                    continue;
                }
                if entry.metadata().map_err(std::io::Error::from)?.modified()? > threshold {
                    return Ok(Some(entry.into_path()));
                }
            }
        }
        Ok(None)
    }

    fn is_tracked(&self, path: &Path) -> bool {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        TRACKED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
    }
}
