//! `pom.xml` reading.
//!
//! Only the parts of the POM that matter for classpath assembly and GWT
//! version detection are read; plugins, profiles and reporting are ignored.

use super::{Dependency, DependencyScope};
use crate::error::{PipelineError, Result};
use crate::util::xml::parse_document;
use regex::Regex;
use roxmltree::Node;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::warn;

/// `<parent>` reference of a POM
#[derive(Debug, Clone, Default)]
pub struct ParentRef {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub relative_path: String,
}

/// `<build>` section, still uninterpolated
#[derive(Debug, Clone, Default)]
pub struct RawBuild {
    pub directory: Option<String>,
    pub final_name: Option<String>,
    pub source_directory: Option<String>,
    pub test_source_directory: Option<String>,
    pub output_directory: Option<String>,
    pub test_output_directory: Option<String>,
    pub resources: Vec<String>,
    pub test_resources: Vec<String>,
}

/// A POM as written on disk, before inheritance and interpolation
#[derive(Debug, Clone, Default)]
pub struct RawPom {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub parent: Option<ParentRef>,
    pub properties: BTreeMap<String, String>,
    pub build: RawBuild,
    pub dependencies: Vec<Dependency>,
    pub dependency_management: Vec<Dependency>,
    pub modules: Vec<String>,
}

impl RawPom {
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.group_id.as_deref()))
    }

    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.version.as_deref()))
    }
}

pub fn read_pom(path: &Path) -> Result<RawPom> {
    let content = fs::read_to_string(path)?;
    parse_pom(&content).map_err(|source| PipelineError::Xml {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_pom(content: &str) -> std::result::Result<RawPom, roxmltree::Error> {
    let doc = parse_document(content)?;
    let root = doc.root_element();

    let mut pom = RawPom {
        group_id: child_text(root, "groupId"),
        artifact_id: child_text(root, "artifactId"),
        version: child_text(root, "version"),
        packaging: child_text(root, "packaging"),
        ..Default::default()
    };

    if let Some(parent) = child(root, "parent") {
        pom.parent = Some(ParentRef {
            group_id: child_text(parent, "groupId"),
            artifact_id: child_text(parent, "artifactId"),
            version: child_text(parent, "version"),
            relative_path: child_text(parent, "relativePath")
                .unwrap_or_else(|| "../pom.xml".to_string()),
        });
    }

    if let Some(properties) = child(root, "properties") {
        for property in properties.children().filter(|n| n.is_element()) {
            let value = property.text().unwrap_or("").trim().to_string();
            pom.properties
                .insert(property.tag_name().name().to_string(), value);
        }
    }

    if let Some(build) = child(root, "build") {
        pom.build = RawBuild {
            directory: child_text(build, "directory"),
            final_name: child_text(build, "finalName"),
            source_directory: child_text(build, "sourceDirectory"),
            test_source_directory: child_text(build, "testSourceDirectory"),
            output_directory: child_text(build, "outputDirectory"),
            test_output_directory: child_text(build, "testOutputDirectory"),
            resources: resource_directories(build, "resources", "resource"),
            test_resources: resource_directories(build, "testResources", "testResource"),
        };
    }

    if let Some(deps) = child(root, "dependencies") {
        pom.dependencies = parse_dependencies(deps);
    }

    if let Some(deps) =
        child(root, "dependencyManagement").and_then(|dm| child(dm, "dependencies"))
    {
        pom.dependency_management = parse_dependencies(deps);
    }

    if let Some(modules) = child(root, "modules") {
        pom.modules = modules
            .children()
            .filter(|n| n.has_tag_name("module"))
            .filter_map(|n| n.text().map(|t| t.trim().to_string()))
            .filter(|t| !t.is_empty())
            .collect();
    }

    Ok(pom)
}

fn parse_dependencies(deps: Node) -> Vec<Dependency> {
    deps.children()
        .filter(|n| n.has_tag_name("dependency"))
        .filter_map(|dep| {
            let group_id = child_text(dep, "groupId")?;
            let artifact_id = child_text(dep, "artifactId")?;
            let scope = match child_text(dep, "scope") {
                Some(raw) => DependencyScope::parse(&raw).unwrap_or_else(|| {
                    warn!(
                        dependency = %format!("{}:{}", group_id, artifact_id),
                        scope = %raw,
                        "Unknown dependency scope, treating as compile"
                    );
                    DependencyScope::Compile
                }),
                None => DependencyScope::Compile,
            };

            Some(Dependency {
                group_id,
                artifact_id,
                version: child_text(dep, "version"),
                scope,
                kind: child_text(dep, "type").unwrap_or_else(|| "jar".to_string()),
                classifier: child_text(dep, "classifier"),
                system_path: child_text(dep, "systemPath").map(PathBuf::from),
                file: None,
            })
        })
        .collect()
}

fn resource_directories(build: Node, container: &str, item: &str) -> Vec<String> {
    child(build, container)
        .map(|c| {
            c.children()
                .filter(|n| n.has_tag_name(item))
                .filter_map(|r| child_text(r, "directory"))
                .collect()
        })
        .unwrap_or_default()
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name(name))
}

fn child_text(node: Node, name: &str) -> Option<String> {
    child(node, name)
        .and_then(|c| c.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Replace `${name}` references with values from `properties`.
///
/// Unknown references are left untouched, the same way Maven leaves them.
pub fn interpolate(value: &str, properties: &BTreeMap<String, String>) -> String {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

    let mut current = value.to_string();
    // Values may reference other properties; bounded to avoid cycles.
    for _ in 0..8 {
        if !current.contains("${") {
            break;
        }
        let next = re
            .replace_all(&current, |caps: &regex::Captures| {
                properties
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current
}
