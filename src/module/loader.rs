use super::ModuleDescriptor;
use crate::error::{PipelineError, Result};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

pub const MODULE_SUFFIX: &str = ".gwt.xml";

/// Finds and reads module descriptors below a set of source/resource roots.
///
/// Descriptors are parsed on every call; nothing is cached between reads.
#[derive(Debug, Clone)]
pub struct ModuleLoader {
    roots: Vec<PathBuf>,
}

impl ModuleLoader {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Qualified names of every descriptor under the roots, sorted
    pub fn discover(&self) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();
        for root in self.roots.iter().filter(|r| r.is_dir()) {
            for entry in WalkDir::new(root).follow_links(true) {
                let entry = entry.map_err(std::io::Error::from)?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let Ok(relative) = entry.path().strip_prefix(root) else {
                    continue;
                };
                if let Some(name) = qualified_name(relative) {
                    trace!(module = %name, path = %entry.path().display(), "Found module descriptor");
                    names.insert(name);
                }
            }
        }
        debug!(count = names.len(), "Discovered GWT modules");
        Ok(names.into_iter().collect())
    }

    /// Path of the descriptor for `name` in the first root that has one
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        let relative = format!("{}{}", name.replace('.', "/"), MODULE_SUFFIX);
        self.roots
            .iter()
            .map(|root| root.join(&relative))
            .find(|p| p.is_file())
    }

    pub fn read(&self, name: &str) -> Result<ModuleDescriptor> {
        let path = self.locate(name).ok_or_else(|| PipelineError::ModuleNotFound {
            name: name.to_string(),
            searched: self.roots.len(),
        })?;
        ModuleDescriptor::from_file(name, &path)
    }

    /// Servlets declared by `module` and by every module it inherits that
    /// lives under the roots. The module's own declarations win.
    pub fn collect_servlets(&self, module: &ModuleDescriptor) -> Result<BTreeMap<String, String>> {
        let mut servlets = BTreeMap::new();
        let mut visited = HashSet::new();
        self.collect_into(module, &mut servlets, &mut visited)?;
        Ok(servlets)
    }

    fn collect_into(
        &self,
        module: &ModuleDescriptor,
        servlets: &mut BTreeMap<String, String>,
        visited: &mut HashSet<String>,
    ) -> Result<()> {
        if !visited.insert(module.qualified_name.clone()) {
            return Ok(());
        }
        for (path, class) in &module.servlets {
            servlets.entry(path.clone()).or_insert_with(|| class.clone());
        }
        for inherited in &module.inherits {
            if visited.contains(inherited) {
                continue;
            }
            // Toolkit modules come from jars and declare no servlets we care about
            if self.locate(inherited).is_none() {
                trace!(module = %inherited, "Inherited module not in source roots");
                continue;
            }
            let parent = self.read(inherited)?;
            self.collect_into(&parent, servlets, visited)?;
        }
        Ok(())
    }
}

fn qualified_name(relative: &Path) -> Option<String> {
    let text = relative.to_string_lossy().replace('\\', "/");
    let stem = text.strip_suffix(MODULE_SUFFIX)?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.replace('/', "."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_module(root: &Path, name: &str, content: &str) {
        let path = root.join(format!("{}{}", name.replace('.', "/"), MODULE_SUFFIX));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_discover_sorted_and_deduplicated() {
        let dir = TempDir::new().unwrap();
        let java = dir.path().join("java");
        let resources = dir.path().join("resources");
        write_module(&java, "com.example.Zeta", "<module/>");
        write_module(&java, "com.example.App", "<module/>");
        write_module(&resources, "com.example.App", "<module/>");
        fs::write(java.join("com/example/README.xml"), "<x/>").unwrap();

        let loader = ModuleLoader::new(vec![java, resources, dir.path().join("missing")]);
        assert_eq!(
            loader.discover().unwrap(),
            vec!["com.example.App", "com.example.Zeta"]
        );
    }

    #[test]
    fn test_read_first_root_wins() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a");
        let second = dir.path().join("b");
        write_module(&first, "com.example.App", "<module rename-to='first'/>");
        write_module(&second, "com.example.App", "<module rename-to='second'/>");

        let module = ModuleLoader::new(vec![first, second])
            .read("com.example.App")
            .unwrap();
        assert_eq!(module.output_name(), "first");
        assert!(module.descriptor_path.is_some());
    }

    #[test]
    fn test_read_missing_module() {
        let dir = TempDir::new().unwrap();
        let loader = ModuleLoader::new(vec![dir.path().to_path_buf()]);
        match loader.read("com.example.Nope") {
            Err(PipelineError::ModuleNotFound { name, searched }) => {
                assert_eq!(name, "com.example.Nope");
                assert_eq!(searched, 1);
            }
            other => panic!("Expected ModuleNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_collect_servlets_follows_inherits() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        write_module(
            &root,
            "com.example.App",
            r#"<module>
                 <inherits name="com.google.gwt.user.User"/>
                 <inherits name="com.example.Rpc"/>
                 <entry-point class="com.example.client.App"/>
                 <servlet path="/greet" class="com.example.server.Greet"/>
               </module>"#,
        );
        write_module(
            &root,
            "com.example.Rpc",
            r#"<module>
                 <inherits name="com.example.App"/>
                 <servlet path="/rpc" class="com.example.server.Rpc"/>
                 <servlet path="/greet" class="com.example.server.Overridden"/>
               </module>"#,
        );

        let loader = ModuleLoader::new(vec![root]);
        let app = loader.read("com.example.App").unwrap();
        let servlets = loader.collect_servlets(&app).unwrap();

        assert_eq!(servlets.len(), 2);
        assert_eq!(servlets["/greet"], "com.example.server.Greet");
        assert_eq!(servlets["/rpc"], "com.example.server.Rpc");
    }
}
