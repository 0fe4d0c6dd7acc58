use super::GoalContext;
use crate::classpath::ClasspathScope;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::module::ModuleDescriptor;
use crate::process::Outcome;
use crate::runtime::{RuntimeDescriptor, VersionTag};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub module: String,
    pub shell_class: String,
    pub output_directory: PathBuf,
    pub copied_libraries: usize,
    pub exit_code: Option<i32>,
    pub outcome: Outcome,
}

/// Hosted-mode shell arguments for `module`
pub fn shell_arguments(
    config: &PipelineConfig,
    tag: VersionTag,
    gen_dir: &Path,
    output_dir: &Path,
    module: &ModuleDescriptor,
) -> Vec<String> {
    let caps = tag.capabilities();
    let mut args = vec![
        "-gen".to_string(),
        gen_dir.display().to_string(),
        "-logLevel".to_string(),
        config.gwt_log_level.clone(),
        "-style".to_string(),
        config.style.clone(),
        "-port".to_string(),
        config.port.to_string(),
    ];
    if config.no_server {
        args.push("-noserver".to_string());
    }
    args.push(caps.web_output_argument.to_string());
    args.push(output_dir.display().to_string());

    if tag >= VersionTag::OneDotSix {
        args.push("-startupUrl".to_string());
        args.push(config.run_target.clone());
        args.push(module.qualified_name.clone());
    } else {
        args.push(format!("{}/{}", module.qualified_name, config.run_target));
    }
    args
}

/// Copy runtime dependency jars into `<war>/WEB-INF/lib`, skipping ones already current.
///
/// The embedded Tomcat of GWT 1.6 only loads server classes from there.
pub fn prepare_war(jars: &[PathBuf], war: &Path) -> Result<usize> {
    let lib = war.join("WEB-INF").join("lib");
    fs::create_dir_all(&lib)?;

    let mut copied = 0;
    for jar in jars {
        let Some(name) = jar.file_name() else {
            continue;
        };
        let target = lib.join(name);
        if is_current(jar, &target) {
            continue;
        }
        debug!(jar = %jar.display(), "Copying into WEB-INF/lib");
        fs::copy(jar, &target)?;
        copied += 1;
    }
    Ok(copied)
}

fn is_current(source: &Path, target: &Path) -> bool {
    let (Ok(src), Ok(dst)) = (fs::metadata(source), fs::metadata(target)) else {
        return false;
    };
    match (src.modified(), dst.modified()) {
        (Ok(s), Ok(d)) => src.len() == dst.len() && d >= s,
        _ => false,
    }
}

/// Runtime-scope jars that belong in the web application, without the GWT toolchain itself
fn runtime_jars(ctx: &GoalContext, runtime: &RuntimeDescriptor) -> Vec<PathBuf> {
    ctx.classpath(ClasspathScope::Runtime, false, false)
        .iter()
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "jar"))
        .filter(|p| **p != runtime.user_jar && **p != runtime.dev_jar)
        .map(Path::to_path_buf)
        .collect()
}

/// Launch the hosted-mode shell for one application module and wait for it to exit.
pub fn run_shell(ctx: &GoalContext) -> Result<RunReport> {
    let config = &ctx.config;
    let project = &ctx.project;
    let tag = ctx.runtime.version;
    let caps = ctx.runtime.capabilities();

    let module = ctx
        .target_modules()?
        .into_iter()
        .find(|m| !m.is_library())
        .ok_or_else(|| {
            PipelineError::Configuration("No module with an entry point to run".to_string())
        })?;

    let output_dir = config.web_output(project);
    fs::create_dir_all(&output_dir)?;

    let copied_libraries = if caps.fix_embedded_tomcat_classloader_issue {
        let jars = runtime_jars(ctx, &ctx.runtime);
        let copied = prepare_war(&jars, &output_dir)?;
        info!(copied, total = jars.len(), "Prepared WEB-INF/lib for embedded Tomcat");
        copied
    } else {
        0
    };

    let args = shell_arguments(config, tag, &config.gen_dir(project), &output_dir, &module);
    info!(module = %module.qualified_name, shell = caps.shell_class, port = config.port, "Starting hosted mode");
    let result = ctx
        .java(caps.shell_class)
        .classpath(ctx.classpath(ClasspathScope::Runtime, true, true))
        .args(args)
        .execute()?;

    Ok(RunReport {
        module: module.qualified_name,
        shell_class: caps.shell_class.to_string(),
        output_directory: output_dir,
        copied_libraries,
        exit_code: result.exit_code,
        outcome: result.outcome,
    })
}
