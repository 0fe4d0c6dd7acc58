use super::{module_loader, target_modules};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::project::ProjectModel;
use crate::webxml::{merge_file, ServletEntry};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub source: PathBuf,
    pub target: PathBuf,
    pub servlets: Vec<ServletEntry>,
    /// `<servlet>` elements in the written descriptor
    pub declared: usize,
}

/// Servlets of every application module, including those it inherits from the source roots
pub fn collect_entries(config: &PipelineConfig, project: &ProjectModel) -> Result<Vec<ServletEntry>> {
    let loader = module_loader(project);
    let mut entries = Vec::new();
    for module in target_modules(config, &loader)? {
        if module.is_library() {
            continue;
        }
        for (path, class) in loader.collect_servlets(&module)? {
            entries.push(ServletEntry::for_module(
                module.output_name(),
                &path,
                &class,
                config.servlet_path_mode,
            ));
        }
    }
    Ok(entries)
}

/// Write `<web output>/WEB-INF/web.xml` with every module servlet declared.
///
/// Needs no GWT toolchain, so this takes the project directly rather than a
/// resolved goal context.
pub fn merge_web_xml(config: &PipelineConfig, project: &ProjectModel) -> Result<MergeReport> {
    let source = config.web_xml_source(project);
    let target = config.web_output(project).join("WEB-INF").join("web.xml");
    let servlets = collect_entries(config, project)?;

    let declared = merge_file(&source, &target, &servlets)?;
    info!(
        source = %source.display(),
        target = %target.display(),
        servlets = servlets.len(),
        declared,
        "Wrote deployment descriptor"
    );

    Ok(MergeReport {
        source,
        target,
        servlets,
        declared,
    })
}
