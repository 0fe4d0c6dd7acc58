//! Maven project model: source roots, output directories and dependencies.

pub mod pom;
mod reactor;

use crate::error::{PipelineError, Result};
use crate::runtime::repository::{ArtifactCoordinates, Repository};
use pom::{interpolate, RawPom};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MAX_PARENT_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyScope {
    #[default]
    Compile,
    Provided,
    Runtime,
    Test,
    System,
    Import,
}

impl DependencyScope {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "compile" => Some(Self::Compile),
            "provided" => Some(Self::Provided),
            "runtime" => Some(Self::Runtime),
            "test" => Some(Self::Test),
            "system" => Some(Self::System),
            "import" => Some(Self::Import),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: DependencyScope,
    /// Maven `<type>`, `jar` by default
    pub kind: String,
    pub classifier: Option<String>,
    pub system_path: Option<PathBuf>,
    /// Resolved location on disk, filled by [`ProjectModel::resolve_dependency_files`]
    pub file: Option<PathBuf>,
}

impl Dependency {
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: Some(version.to_string()),
            scope: DependencyScope::Compile,
            kind: "jar".to_string(),
            classifier: None,
            system_path: None,
            file: None,
        }
    }

    pub fn with_scope(mut self, scope: DependencyScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = kind.to_string();
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn matches(&self, group_id: &str, artifact_id: &str) -> bool {
        self.group_id == group_id && self.artifact_id == artifact_id
    }

    /// Whether artifacts of this type belong on a JVM classpath
    pub fn is_added_to_classpath(&self) -> bool {
        matches!(self.kind.as_str(), "jar" | "test-jar" | "ejb" | "ejb-client")
    }

    fn extension(&self) -> &str {
        match self.kind.as_str() {
            "test-jar" | "ejb" | "ejb-client" | "maven-plugin" => "jar",
            other => other,
        }
    }

    fn effective_classifier(&self) -> Option<String> {
        self.classifier.clone().or_else(|| match self.kind.as_str() {
            "test-jar" => Some("tests".to_string()),
            "ejb-client" => Some("client".to_string()),
            _ => None,
        })
    }

    pub fn coordinates(&self) -> Option<ArtifactCoordinates> {
        let version = self.version.as_deref()?;
        let mut coords =
            ArtifactCoordinates::new(&self.group_id, &self.artifact_id, version)
                .with_extension(self.extension());
        if let Some(classifier) = self.effective_classifier() {
            coords = coords.with_classifier(&classifier);
        }
        Some(coords)
    }

    pub fn id(&self) -> String {
        format!(
            "{}:{}:{}",
            self.group_id,
            self.artifact_id,
            self.version.as_deref().unwrap_or("?")
        )
    }

    fn interpolated(mut self, properties: &BTreeMap<String, String>) -> Self {
        self.group_id = interpolate(&self.group_id, properties);
        self.artifact_id = interpolate(&self.artifact_id, properties);
        self.version = self.version.map(|v| interpolate(&v, properties));
        self.classifier = self.classifier.map(|c| interpolate(&c, properties));
        self.system_path = self
            .system_path
            .map(|p| PathBuf::from(interpolate(&p.to_string_lossy(), properties)));
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectModel {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub packaging: String,
    pub base_dir: PathBuf,
    pub source_roots: Vec<PathBuf>,
    pub test_source_roots: Vec<PathBuf>,
    pub resource_roots: Vec<PathBuf>,
    pub test_resource_roots: Vec<PathBuf>,
    pub output_directory: PathBuf,
    pub test_output_directory: PathBuf,
    pub build_directory: PathBuf,
    pub final_name: String,
    pub dependencies: Vec<Dependency>,
    pub dependency_management: Vec<Dependency>,
    pub modules: Vec<String>,
    pub properties: BTreeMap<String, String>,
    /// Reactor siblings this project depends on
    #[serde(skip)]
    pub project_references: Vec<ProjectModel>,
}

impl ProjectModel {
    /// A project laid out with Maven's default directories
    pub fn new(group_id: &str, artifact_id: &str, version: &str, base_dir: &Path) -> Self {
        let build_directory = base_dir.join("target");
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            packaging: "jar".to_string(),
            base_dir: base_dir.to_path_buf(),
            source_roots: vec![base_dir.join("src/main/java")],
            test_source_roots: vec![base_dir.join("src/test/java")],
            resource_roots: vec![base_dir.join("src/main/resources")],
            test_resource_roots: vec![base_dir.join("src/test/resources")],
            output_directory: build_directory.join("classes"),
            test_output_directory: build_directory.join("test-classes"),
            final_name: format!("{}-{}", artifact_id, version),
            build_directory,
            dependencies: Vec::new(),
            dependency_management: Vec::new(),
            modules: Vec::new(),
            properties: BTreeMap::new(),
            project_references: Vec::new(),
        }
    }

    /// Load `<base_dir>/pom.xml`, its parents, and the reactor siblings it depends on.
    pub fn load(base_dir: &Path) -> Result<Self> {
        let mut project = Self::load_single(base_dir)?;
        reactor::attach_siblings(&mut project)?;
        Ok(project)
    }

    /// Load `<base_dir>/pom.xml` and its parents, without looking at siblings.
    pub fn load_single(base_dir: &Path) -> Result<Self> {
        let pom_path = base_dir.join("pom.xml");
        if !pom_path.is_file() {
            return Err(PipelineError::Configuration(format!(
                "No pom.xml found in {}",
                base_dir.display()
            )));
        }
        let raw = pom::read_pom(&pom_path)?;
        let inherited = inherited_context(&raw, base_dir, 0)?;
        Self::from_raw(raw, base_dir, inherited)
    }

    fn from_raw(raw: RawPom, base_dir: &Path, inherited: Inherited) -> Result<Self> {
        let artifact_id = raw.artifact_id.clone().ok_or_else(|| {
            PipelineError::Configuration(format!(
                "pom.xml in {} has no artifactId",
                base_dir.display()
            ))
        })?;
        let group_id = raw
            .effective_group_id()
            .map(str::to_string)
            .or(inherited.group_id.clone())
            .unwrap_or_default();
        let version = raw
            .effective_version()
            .map(str::to_string)
            .or(inherited.version.clone())
            .unwrap_or_else(|| "0-SNAPSHOT".to_string());

        let mut properties = inherited.properties;
        properties.extend(raw.properties.clone());
        properties.insert("project.groupId".to_string(), group_id.clone());
        properties.insert("project.artifactId".to_string(), artifact_id.clone());
        properties.insert("project.version".to_string(), version.clone());
        properties.insert("pom.version".to_string(), version.clone());
        properties.insert("version".to_string(), version.clone());
        properties.insert("basedir".to_string(), base_dir.display().to_string());
        properties.insert("project.basedir".to_string(), base_dir.display().to_string());

        let mut project = Self::new(
            &interpolate(&group_id, &properties),
            &artifact_id,
            &interpolate(&version, &properties),
            base_dir,
        );
        project.packaging = raw.packaging.clone().unwrap_or_else(|| "jar".to_string());
        project.modules = raw.modules.clone();

        let build = &raw.build;
        if let Some(dir) = &build.directory {
            project.build_directory = relative_to(base_dir, &interpolate(dir, &properties));
        }
        properties.insert(
            "project.build.directory".to_string(),
            project.build_directory.display().to_string(),
        );
        let resolve = |value: &str| relative_to(base_dir, &interpolate(value, &properties));
        project.output_directory = build
            .output_directory
            .as_deref()
            .map(&resolve)
            .unwrap_or_else(|| project.build_directory.join("classes"));
        project.test_output_directory = build
            .test_output_directory
            .as_deref()
            .map(&resolve)
            .unwrap_or_else(|| project.build_directory.join("test-classes"));
        if let Some(dir) = &build.source_directory {
            project.source_roots = vec![resolve(dir)];
        }
        if let Some(dir) = &build.test_source_directory {
            project.test_source_roots = vec![resolve(dir)];
        }
        if !build.resources.is_empty() {
            project.resource_roots = build.resources.iter().map(|r| resolve(r)).collect();
        }
        if !build.test_resources.is_empty() {
            project.test_resource_roots =
                build.test_resources.iter().map(|r| resolve(r)).collect();
        }
        if let Some(name) = &build.final_name {
            project.final_name = interpolate(name, &properties);
        }

        let mut management: Vec<Dependency> = raw
            .dependency_management
            .into_iter()
            .map(|d| d.interpolated(&properties))
            .collect();
        for parent_dep in inherited.dependency_management {
            if !management
                .iter()
                .any(|d| d.matches(&parent_dep.group_id, &parent_dep.artifact_id))
            {
                management.push(parent_dep.interpolated(&properties));
            }
        }

        project.dependencies = raw
            .dependencies
            .into_iter()
            .map(|d| {
                let mut dep = d.interpolated(&properties);
                if dep.version.is_none() {
                    if let Some(managed) = management
                        .iter()
                        .find(|m| m.matches(&dep.group_id, &dep.artifact_id))
                    {
                        dep.version = managed.version.clone();
                    }
                }
                dep
            })
            .collect();
        project.dependency_management = management;
        project.properties = properties;

        Ok(project)
    }

    pub fn id(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }

    /// Version of `group:artifact`, looked up in dependencies first, then dependency management
    pub fn find_dependency_version(&self, group_id: &str, artifact_id: &str) -> Option<&str> {
        self.dependencies
            .iter()
            .chain(self.dependency_management.iter())
            .find(|d| d.matches(group_id, artifact_id))
            .and_then(|d| d.version.as_deref())
    }

    /// Compile source roots of this project and of every referenced sibling
    pub fn all_source_roots(&self) -> Vec<PathBuf> {
        let mut roots = self.source_roots.clone();
        roots.extend(self.resource_roots.iter().cloned());
        for reference in &self.project_references {
            roots.extend(reference.source_roots.iter().cloned());
            roots.extend(reference.resource_roots.iter().cloned());
        }
        roots
    }

    /// Fill `file` for every dependency that lands on a classpath.
    ///
    /// System-scoped dependencies point at their `systemPath`; everything
    /// else comes from the repository, downloaded when missing.
    pub fn resolve_dependency_files(&mut self, repository: &Repository) -> Result<()> {
        for dep in &mut self.dependencies {
            if dep.file.is_some() || dep.scope == DependencyScope::Import {
                continue;
            }
            if dep.scope == DependencyScope::System {
                let path = dep.system_path.clone().ok_or_else(|| {
                    PipelineError::Configuration(format!(
                        "System-scoped dependency {} has no systemPath",
                        dep.id()
                    ))
                })?;
                if !path.exists() {
                    return Err(PipelineError::ArtifactNotFound {
                        coordinates: format!("{} ({})", dep.id(), path.display()),
                    });
                }
                dep.file = Some(path);
                continue;
            }
            if !dep.is_added_to_classpath() {
                debug!(dependency = %dep.id(), kind = %dep.kind, "Skipping non-classpath dependency");
                continue;
            }
            let coords = dep.coordinates().ok_or_else(|| {
                PipelineError::Configuration(format!(
                    "Dependency {}:{} has no version and none is managed",
                    dep.group_id, dep.artifact_id
                ))
            })?;
            dep.file = Some(repository.resolve(&coords)?);
        }
        Ok(())
    }
}

fn relative_to(base_dir: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

/// Values a POM inherits from its parent chain
#[derive(Debug, Default)]
struct Inherited {
    group_id: Option<String>,
    version: Option<String>,
    properties: BTreeMap<String, String>,
    dependency_management: Vec<Dependency>,
}

fn inherited_context(raw: &RawPom, base_dir: &Path, depth: usize) -> Result<Inherited> {
    let Some(parent_ref) = &raw.parent else {
        return Ok(Inherited::default());
    };
    if depth >= MAX_PARENT_DEPTH {
        warn!(dir = %base_dir.display(), "Parent POM chain too deep, ignoring further parents");
        return Ok(Inherited::default());
    }

    let mut parent_path = base_dir.join(&parent_ref.relative_path);
    if parent_path.is_dir() {
        parent_path = parent_path.join("pom.xml");
    }
    if !parent_path.is_file() {
        debug!(path = %parent_path.display(), "Parent POM not on disk, using <parent> coordinates only");
        return Ok(Inherited {
            group_id: parent_ref.group_id.clone(),
            version: parent_ref.version.clone(),
            ..Default::default()
        });
    }

    let parent = pom::read_pom(&parent_path)?;
    if parent.artifact_id.is_some()
        && parent_ref.artifact_id.is_some()
        && parent.artifact_id != parent_ref.artifact_id
    {
        debug!(path = %parent_path.display(), "POM at relativePath is not the declared parent");
        return Ok(Inherited {
            group_id: parent_ref.group_id.clone(),
            version: parent_ref.version.clone(),
            ..Default::default()
        });
    }

    let parent_dir = parent_path.parent().unwrap_or(base_dir).to_path_buf();
    let grand = inherited_context(&parent, &parent_dir, depth + 1)?;

    let mut properties = grand.properties;
    properties.extend(parent.properties.clone());
    if let Some(v) = parent.effective_version().or(grand.version.as_deref()) {
        properties.insert("project.parent.version".to_string(), v.to_string());
    }

    let mut management = parent.dependency_management.clone();
    for dep in grand.dependency_management {
        if !management
            .iter()
            .any(|d| d.matches(&dep.group_id, &dep.artifact_id))
        {
            management.push(dep);
        }
    }

    Ok(Inherited {
        group_id: parent_ref
            .group_id
            .clone()
            .or_else(|| parent.effective_group_id().map(str::to_string))
            .or(grand.group_id),
        version: parent_ref
            .version
            .clone()
            .or_else(|| parent.effective_version().map(str::to_string))
            .or(grand.version),
        properties,
        dependency_management: management,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_defaults_follow_maven_layout() {
        let project = ProjectModel::new("g", "a", "1", Path::new("/p"));
        assert_eq!(project.source_roots, vec![PathBuf::from("/p/src/main/java")]);
        assert_eq!(project.output_directory, PathBuf::from("/p/target/classes"));
        assert_eq!(project.final_name, "a-1");
    }

    #[test]
    fn test_added_to_classpath_by_type() {
        assert!(Dependency::new("g", "a", "1").is_added_to_classpath());
        assert!(Dependency::new("g", "a", "1")
            .with_kind("test-jar")
            .is_added_to_classpath());
        assert!(!Dependency::new("g", "a", "1")
            .with_kind("pom")
            .is_added_to_classpath());
        assert!(!Dependency::new("g", "a", "1")
            .with_kind("war")
            .is_added_to_classpath());
    }

    #[test]
    fn test_test_jar_coordinates() {
        let coords = Dependency::new("g", "a", "1")
            .with_kind("test-jar")
            .coordinates()
            .unwrap();
        assert_eq!(coords.file_name(), "a-1-tests.jar");
    }

    #[test]
    fn test_load_inherits_from_parent_on_disk() {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("pom.xml"),
            r#"<project>
                <groupId>com.example</groupId>
                <artifactId>parent</artifactId>
                <version>2.1</version>
                <packaging>pom</packaging>
                <properties><gwt.version>1.6.4</gwt.version></properties>
                <dependencyManagement><dependencies>
                  <dependency>
                    <groupId>com.google.gwt</groupId>
                    <artifactId>gwt-user</artifactId>
                    <version>${gwt.version}</version>
                  </dependency>
                </dependencies></dependencyManagement>
            </project>"#,
        );
        let child = dir.path().join("web");
        write(
            &child.join("pom.xml"),
            r#"<project>
                <parent>
                  <groupId>com.example</groupId>
                  <artifactId>parent</artifactId>
                  <version>2.1</version>
                </parent>
                <artifactId>web</artifactId>
                <dependencies>
                  <dependency>
                    <groupId>com.google.gwt</groupId>
                    <artifactId>gwt-user</artifactId>
                    <scope>provided</scope>
                  </dependency>
                </dependencies>
            </project>"#,
        );

        let project = ProjectModel::load_single(&child).unwrap();
        assert_eq!(project.id(), "com.example:web:2.1");
        assert_eq!(
            project.find_dependency_version("com.google.gwt", "gwt-user"),
            Some("1.6.4")
        );
        assert_eq!(project.dependencies[0].scope, DependencyScope::Provided);
    }

    #[test]
    fn test_load_missing_pom_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let err = ProjectModel::load(dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_resolve_system_dependency() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("lib/tools.jar");
        write(&jar, "jar");

        let mut project = ProjectModel::new("g", "a", "1", dir.path());
        let mut dep = Dependency::new("sun", "tools", "1.6").with_scope(DependencyScope::System);
        dep.system_path = Some(jar.clone());
        project.dependencies.push(dep);

        let repo = Repository::offline(dir.path().join("repo"));
        project.resolve_dependency_files(&repo).unwrap();
        assert_eq!(project.dependencies[0].file.as_deref(), Some(jar.as_path()));
    }

    #[test]
    fn test_resolve_offline_missing_dependency_fails() {
        let dir = TempDir::new().unwrap();
        let mut project = ProjectModel::new("g", "a", "1", dir.path());
        project.dependencies.push(Dependency::new("junit", "junit", "4.5"));

        let repo = Repository::offline(dir.path().join("repo"));
        let err = project.resolve_dependency_files(&repo).unwrap_err();
        assert!(matches!(err, PipelineError::ArtifactNotFound { .. }));
    }

    #[test]
    fn test_resolve_from_local_repository() {
        let dir = TempDir::new().unwrap();
        let repo_root = dir.path().join("repo");
        let jar = repo_root.join("junit/junit/4.5/junit-4.5.jar");
        write(&jar, "jar");

        let mut project = ProjectModel::new("g", "a", "1", dir.path());
        project.dependencies.push(Dependency::new("junit", "junit", "4.5"));
        project
            .dependencies
            .push(Dependency::new("g", "bom", "1").with_kind("pom"));

        let repo = Repository::offline(repo_root);
        project.resolve_dependency_files(&repo).unwrap();
        assert_eq!(project.dependencies[0].file.as_deref(), Some(jar.as_path()));
        assert!(project.dependencies[1].file.is_none());
    }
}
