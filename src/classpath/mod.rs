//! Classpath assembly for the GWT tools.
//!
//! A GWT compile needs Java *sources* on the classpath, not just classes, so
//! the assembled path mixes source roots, resource roots, output directories
//! and dependency jars. The toolchain jars always come last.

use crate::error::PipelineError;
use crate::project::{DependencyScope, ProjectModel};
use crate::runtime::RuntimeDescriptor;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClasspathScope {
    Compile,
    Runtime,
    Test,
}

impl FromStr for ClasspathScope {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compile" => Ok(Self::Compile),
            "runtime" => Ok(Self::Runtime),
            "test" => Ok(Self::Test),
            _ => Err(PipelineError::UnsupportedScope(s.to_string())),
        }
    }
}

impl fmt::Display for ClasspathScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Compile => "compile",
            Self::Runtime => "runtime",
            Self::Test => "test",
        };
        write!(f, "{}", name)
    }
}

impl ClasspathScope {
    /// Whether a dependency of `scope` belongs on this classpath
    fn admits(&self, scope: DependencyScope) -> bool {
        match self {
            Self::Test => scope != DependencyScope::Import,
            Self::Compile => matches!(
                scope,
                DependencyScope::Compile | DependencyScope::Provided | DependencyScope::System
            ),
            Self::Runtime => !matches!(scope, DependencyScope::Test | DependencyScope::Import),
        }
    }
}

/// Insertion-ordered set of paths
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Classpath {
    entries: Vec<PathBuf>,
    #[serde(skip)]
    seen: HashSet<PathBuf>,
}

impl Classpath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `path` unless it is already present. Returns whether it was added.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.seen.contains(&path) {
            return false;
        }
        self.seen.insert(path.clone());
        self.entries.push(path);
        true
    }

    /// Add `path` at the end, moving it there if it was already present.
    pub fn append_last(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if self.seen.contains(&path) {
            self.entries.retain(|p| p != &path);
        } else {
            self.seen.insert(path.clone());
        }
        self.entries.push(path);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.seen.contains(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(PathBuf::as_path)
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Join with the platform path separator
    pub fn join(&self) -> String {
        let separator = if cfg!(windows) { ";" } else { ":" };
        self.entries
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl<'a> IntoIterator for &'a Classpath {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

pub struct ClasspathBuilder<'a> {
    project: &'a ProjectModel,
    runtime: &'a RuntimeDescriptor,
    include_sources: bool,
    include_resources: bool,
}

impl<'a> ClasspathBuilder<'a> {
    pub fn new(project: &'a ProjectModel, runtime: &'a RuntimeDescriptor) -> Self {
        Self {
            project,
            runtime,
            include_sources: false,
            include_resources: false,
        }
    }

    pub fn with_sources(mut self, include: bool) -> Self {
        self.include_sources = include;
        self
    }

    pub fn with_resources(mut self, include: bool) -> Self {
        self.include_resources = include;
        self
    }

    pub fn build(&self, scope: ClasspathScope) -> Classpath {
        let project = self.project;
        let test = scope == ClasspathScope::Test;
        let mut classpath = Classpath::new();

        if self.include_sources {
            classpath.extend_from(&project.source_roots);
            if test {
                classpath.extend_from(&project.test_source_roots);
            }
            for reference in &project.project_references {
                classpath.extend_from(&reference.source_roots);
            }
        }

        if self.include_resources {
            classpath.extend_from(&project.resource_roots);
            if test {
                classpath.extend_from(&project.test_resource_roots);
            }
            for reference in &project.project_references {
                classpath.extend_from(&reference.resource_roots);
            }
        }

        classpath.add(&project.output_directory);
        if test {
            classpath.add(&project.test_output_directory);
        }

        for dep in &project.dependencies {
            if !scope.admits(dep.scope) {
                continue;
            }
            if scope == ClasspathScope::Runtime && !dep.is_added_to_classpath() {
                continue;
            }
            match &dep.file {
                Some(file) => {
                    classpath.add(file);
                }
                None if dep.is_added_to_classpath() => {
                    warn!(dependency = %dep.id(), "Dependency not resolved, left off the classpath")
                }
                None => debug!(dependency = %dep.id(), kind = %dep.kind, "No file for non-jar dependency"),
            }
        }

        classpath.append_last(&self.runtime.user_jar);
        classpath.append_last(&self.runtime.dev_jar);

        debug!(scope = %scope, entries = classpath.len(), "Assembled classpath");
        classpath
    }
}

impl Classpath {
    fn extend_from(&mut self, paths: &[PathBuf]) {
        for path in paths {
            self.add(path);
        }
    }
}
