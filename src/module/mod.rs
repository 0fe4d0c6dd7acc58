//! GWT module descriptors (`*.gwt.xml`).

mod loader;

pub use loader::{ModuleLoader, MODULE_SUFFIX};

use crate::error::{PipelineError, Result};
use crate::util::xml::parse_document;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Source path used when a module declares no `<source>` element
pub const DEFAULT_SOURCE_PATH: &str = "client";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    pub qualified_name: String,
    pub source_paths: Vec<String>,
    pub super_source_paths: Vec<String>,
    pub entry_points: Vec<String>,
    pub inherits: Vec<String>,
    /// Servlet path to implementation class
    pub servlets: BTreeMap<String, String>,
    pub rename_to: Option<String>,
    pub descriptor_path: Option<PathBuf>,
}

impl ModuleDescriptor {
    pub fn parse(qualified_name: &str, xml: &str) -> Result<Self, roxmltree::Error> {
        let doc = parse_document(xml)?;
        let root = doc.root_element();

        let mut module = Self {
            qualified_name: qualified_name.to_string(),
            source_paths: Vec::new(),
            super_source_paths: Vec::new(),
            entry_points: Vec::new(),
            inherits: Vec::new(),
            servlets: BTreeMap::new(),
            rename_to: root
                .attribute("rename-to")
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            descriptor_path: None,
        };

        for node in root.children().filter(|n| n.is_element()) {
            match node.tag_name().name() {
                "inherits" => push_attr(&mut module.inherits, node, "name"),
                "source" => push_attr(&mut module.source_paths, node, "path"),
                "super-source" => push_attr(&mut module.super_source_paths, node, "path"),
                "entry-point" => push_attr(&mut module.entry_points, node, "class"),
                "servlet" => {
                    if let (Some(path), Some(class)) =
                        (node.attribute("path"), node.attribute("class"))
                    {
                        module
                            .servlets
                            .insert(path.trim().to_string(), class.trim().to_string());
                    }
                }
                _ => {}
            }
        }

        if module.source_paths.is_empty() {
            module.source_paths.push(DEFAULT_SOURCE_PATH.to_string());
        }
        Ok(module)
    }

    pub fn from_file(qualified_name: &str, path: &Path) -> Result<Self> {
        let xml = fs::read_to_string(path)?;
        let mut module = Self::parse(qualified_name, &xml).map_err(|source| PipelineError::Xml {
            path: path.to_path_buf(),
            source,
        })?;
        module.descriptor_path = Some(path.to_path_buf());
        Ok(module)
    }

    /// A module without entry points only exists to be inherited
    pub fn is_library(&self) -> bool {
        self.entry_points.is_empty()
    }

    /// Name of the directory the compiler writes this module to
    pub fn output_name(&self) -> &str {
        self.rename_to.as_deref().unwrap_or(&self.qualified_name)
    }

    pub fn package(&self) -> &str {
        self.qualified_name
            .rsplit_once('.')
            .map(|(package, _)| package)
            .unwrap_or("")
    }

    /// Source packages, e.g. `com.example.client`
    pub fn source_packages(&self) -> Vec<String> {
        let package = self.package();
        self.source_paths
            .iter()
            .map(|p| {
                let sub = p.trim_matches('/').replace('/', ".");
                match (package.is_empty(), sub.is_empty()) {
                    (true, _) => sub,
                    (false, true) => package.to_string(),
                    (false, false) => format!("{}.{}", package, sub),
                }
            })
            .collect()
    }
}

fn push_attr(target: &mut Vec<String>, node: roxmltree::Node, attribute: &str) {
    if let Some(value) = node.attribute(attribute).map(str::trim).filter(|v| !v.is_empty()) {
        target.push(value.to_string());
    }
}
