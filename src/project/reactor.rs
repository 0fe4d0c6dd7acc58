//! Multi-module (reactor) builds.
//!
//! When the project's parent directory holds an aggregator POM listing it
//! as a module, the sibling modules the project depends on become project
//! references: their sources and resources join the GWT classpath, and the
//! dependency resolves to the sibling's output directory instead of a jar.

use super::{pom, ProjectModel};
use crate::error::Result;
use tracing::{debug, warn};

pub(super) fn attach_siblings(project: &mut ProjectModel) -> Result<()> {
    let Some(parent_dir) = project.base_dir.parent().map(|p| p.to_path_buf()) else {
        return Ok(());
    };
    let aggregator = parent_dir.join("pom.xml");
    if !aggregator.is_file() {
        return Ok(());
    }

    let raw = match pom::read_pom(&aggregator) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %aggregator.display(), error = %e, "Ignoring unreadable aggregator POM");
            return Ok(());
        }
    };

    let own_dir = project.base_dir.canonicalize().unwrap_or_else(|_| project.base_dir.clone());
    let listed = raw.modules.iter().any(|m| {
        let dir = parent_dir.join(m);
        dir.canonicalize().unwrap_or(dir) == own_dir
    });
    if !listed {
        return Ok(());
    }

    for module in &raw.modules {
        let dir = parent_dir.join(module);
        if dir.canonicalize().unwrap_or_else(|_| dir.clone()) == own_dir {
            continue;
        }
        let sibling = match ProjectModel::load_single(&dir) {
            Ok(sibling) => sibling,
            Err(e) => {
                warn!(module = %module, error = %e, "Skipping unreadable reactor module");
                continue;
            }
        };
        link(project, sibling);
    }

    Ok(())
}

/// Record `sibling` as a reference when `project` depends on it
fn link(project: &mut ProjectModel, sibling: ProjectModel) {
    let mut referenced = false;
    for dep in project
        .dependencies
        .iter_mut()
        .filter(|d| d.matches(&sibling.group_id, &sibling.artifact_id))
    {
        if dep.is_added_to_classpath() && dep.file.is_none() {
            dep.file = Some(sibling.output_directory.clone());
        }
        referenced = true;
    }

    if referenced {
        debug!(
            project = %project.id(),
            sibling = %sibling.id(),
            "Linked reactor sibling as project reference"
        );
        project.project_references.push(sibling);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn reactor() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("pom.xml"),
            r#"<project>
                <groupId>com.example</groupId>
                <artifactId>root</artifactId>
                <version>1.0</version>
                <packaging>pom</packaging>
                <modules>
                  <module>shared</module>
                  <module>web</module>
                  <module>unrelated</module>
                </modules>
            </project>"#,
        );
        for name in ["shared", "unrelated"] {
            write(
                &dir.path().join(name).join("pom.xml"),
                &format!(
                    r#"<project>
                        <parent><groupId>com.example</groupId><artifactId>root</artifactId><version>1.0</version></parent>
                        <artifactId>{}</artifactId>
                    </project>"#,
                    name
                ),
            );
        }
        write(
            &dir.path().join("web/pom.xml"),
            r#"<project>
                <parent><groupId>com.example</groupId><artifactId>root</artifactId><version>1.0</version></parent>
                <artifactId>web</artifactId>
                <dependencies>
                  <dependency>
                    <groupId>com.example</groupId>
                    <artifactId>shared</artifactId>
                    <version>1.0</version>
                  </dependency>
                </dependencies>
            </project>"#,
        );
        dir
    }

    #[test]
    fn test_sibling_dependency_becomes_reference() {
        let dir = reactor();
        let project = ProjectModel::load(&dir.path().join("web")).unwrap();

        assert_eq!(project.project_references.len(), 1);
        let shared = &project.project_references[0];
        assert_eq!(shared.artifact_id, "shared");
        assert_eq!(
            project.dependencies[0].file.as_deref(),
            Some(shared.output_directory.as_path())
        );
    }

    #[test]
    fn test_sibling_sources_are_visible() {
        let dir = reactor();
        let project = ProjectModel::load(&dir.path().join("web")).unwrap();
        let roots = project.all_source_roots();
        assert!(roots.contains(&dir.path().join("shared/src/main/java")));
        assert!(!roots.contains(&dir.path().join("unrelated/src/main/java")));
    }

    #[test]
    fn test_standalone_project_has_no_references() {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("app/pom.xml"),
            "<project><groupId>g</groupId><artifactId>app</artifactId><version>1</version></project>",
        );
        let project = ProjectModel::load(&dir.path().join("app")).unwrap();
        assert!(project.project_references.is_empty());
    }
}
