//! The build goals: compile, test, run and merge-web-xml.
//!
//! Each goal is a free function over a [`GoalContext`], which carries
//! everything resolved once per invocation.

pub mod compile;
pub mod merge_web_xml;
pub mod run;

use crate::classpath::{Classpath, ClasspathBuilder, ClasspathScope};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::module::{ModuleDescriptor, ModuleLoader};
use crate::process::JavaCommand;
use crate::project::ProjectModel;
use crate::runtime::{ArtifactResolver, RuntimeDescriptor};
use std::path::Path;
use tracing::{debug, info};

pub struct GoalContext {
    pub config: PipelineConfig,
    pub project: ProjectModel,
    pub runtime: RuntimeDescriptor,
}

impl GoalContext {
    /// Validate the configuration, load the project, resolve the GWT
    /// toolchain and the project's dependency files.
    pub fn prepare(config: PipelineConfig, project_dir: &Path) -> Result<Self> {
        config
            .validate()
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;

        let mut project = ProjectModel::load(project_dir)?;
        info!(project = %project.id(), "Loaded project");

        let repository = config.repository();
        let runtime = ArtifactResolver::new(&repository, config.platform).resolve(
            config.gwt_home.as_deref(),
            config.gwt_version.as_deref(),
            Some(&project),
        )?;
        project.resolve_dependency_files(&repository)?;
        debug!(
            dependencies = project.dependencies.len(),
            references = project.project_references.len(),
            "Resolved project dependencies"
        );

        Ok(Self {
            config,
            project,
            runtime,
        })
    }

    pub fn module_loader(&self) -> ModuleLoader {
        module_loader(&self.project)
    }

    pub fn classpath(&self, scope: ClasspathScope, sources: bool, resources: bool) -> Classpath {
        ClasspathBuilder::new(&self.project, &self.runtime)
            .with_sources(sources)
            .with_resources(resources)
            .build(scope)
    }

    /// A `java` invocation of `main_class` with the configured JVM settings
    pub fn java(&self, main_class: &str) -> JavaCommand {
        JavaCommand::new(self.config.java_executable(), main_class)
            .jvm_args(self.config.jvm_args.iter().cloned())
            .strategy(self.config.classpath_strategy)
            .timeout(self.config.timeout())
            .scratch_dir(self.config.scratch_dir(&self.project))
            .working_dir(&self.project.base_dir)
    }

    pub fn target_modules(&self) -> Result<Vec<ModuleDescriptor>> {
        target_modules(&self.config, &self.module_loader())
    }
}

pub(crate) fn module_loader(project: &ProjectModel) -> ModuleLoader {
    ModuleLoader::new(project.all_source_roots())
}

/// Configured modules, or every module found under the source roots
pub(crate) fn target_modules(
    config: &PipelineConfig,
    loader: &ModuleLoader,
) -> Result<Vec<ModuleDescriptor>> {
    let names = if config.modules.is_empty() {
        loader.discover()?
    } else {
        config.modules.clone()
    };
    if names.is_empty() {
        return Err(PipelineError::Configuration(format!(
            "No GWT modules found in {} source root(s)",
            loader.roots().len()
        )));
    }
    names.iter().map(|name| loader.read(name)).collect()
}
