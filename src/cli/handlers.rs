//! Command handlers: load configuration, run a goal, print its report.
//!
//! Each handler returns the process exit code.

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

use super::commands::{ClasspathArgs, CompileArgs, MergeWebXmlArgs, ProjectArgs, RunArgs, TestArgs};
use super::output::OutputFormatter;
use crate::classpath::ClasspathScope;
use crate::config::PipelineConfig;
use crate::goals::{self, compile, merge_web_xml, run, test, GoalContext};
use crate::project::ProjectModel;

fn project_dir(args: &ProjectArgs) -> Result<PathBuf> {
    match &args.project {
        Some(dir) => Ok(dir.clone()),
        None => env::current_dir().context("Failed to determine current directory"),
    }
}

/// Configuration for the project, with command-line flags applied last
fn load_config(args: &ProjectArgs, dir: &Path) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load(dir)
        .with_context(|| format!("Failed to load configuration for {}", dir.display()))?;
    if let Some(home) = &args.gwt_home {
        config.gwt_home = Some(home.clone());
    }
    if let Some(version) = &args.gwt_version {
        config.gwt_version = Some(version.clone());
    }
    if args.offline {
        config.offline = true;
    }
    debug!("Configuration: {:?}", config);
    Ok(config)
}

fn prepare(args: &ProjectArgs, configure: impl FnOnce(&mut PipelineConfig)) -> Result<GoalContext> {
    let dir = project_dir(args)?;
    let mut config = load_config(args, &dir)?;
    configure(&mut config);
    GoalContext::prepare(config, &dir)
        .with_context(|| format!("Failed to prepare build for {}", dir.display()))
}

fn finish(result: Result<String>) -> i32 {
    match result {
        Ok(output) => {
            print!("{}", output);
            0
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

pub fn handle_compile(args: &CompileArgs) -> i32 {
    finish(compile_goal(args))
}

fn compile_goal(args: &CompileArgs) -> Result<String> {
    let ctx = prepare(&args.project, |config| {
        if !args.modules.is_empty() {
            config.modules = args.modules.clone();
        }
        if let Some(style) = &args.style {
            config.style = style.to_uppercase();
        }
        if args.local_workers.is_some() {
            config.local_workers = args.local_workers;
        }
        config.force |= args.force;
        config.draft_compile |= args.draft;
    })?;
    let report = compile::compile(&ctx).context("GWT compilation failed")?;
    OutputFormatter::new(args.project.format.into()).format_compile(&report)
}

pub fn handle_test(args: &TestArgs) -> i32 {
    finish(test_goal(args))
}

fn test_goal(args: &TestArgs) -> Result<String> {
    let ctx = prepare(&args.project, |config| {
        if !args.includes.is_empty() {
            config.test_includes = args.includes.clone();
        }
        config.test_web_mode |= args.web_mode;
        config.test_failure_ignore |= args.ignore_failures;
    })?;
    let report = test::run_tests(&ctx).context("Failed to run GWT tests")?;
    let output = OutputFormatter::new(args.project.format.into()).format_test(&report)?;
    print!("{}", output);
    report.verify(ctx.config.test_failure_ignore)?;
    Ok(String::new())
}

pub fn handle_run(args: &RunArgs) -> i32 {
    finish(run_goal(args))
}

fn run_goal(args: &RunArgs) -> Result<String> {
    let ctx = prepare(&args.project, |config| {
        if let Some(module) = &args.module {
            config.modules = vec![module.clone()];
        }
        if let Some(port) = args.port {
            config.port = port;
        }
        config.no_server |= args.no_server;
    })?;
    let report = run::run_shell(&ctx).context("Hosted mode failed")?;
    OutputFormatter::new(args.project.format.into()).format_run(&report)
}

pub fn handle_merge_web_xml(args: &MergeWebXmlArgs) -> i32 {
    finish(merge_web_xml_goal(args))
}

fn merge_web_xml_goal(args: &MergeWebXmlArgs) -> Result<String> {
    let dir = project_dir(&args.project)?;
    let mut config = load_config(&args.project, &dir)?;
    if let Some(web_xml) = &args.web_xml {
        config.web_xml = web_xml.clone();
    }
    let project = ProjectModel::load(&dir)
        .with_context(|| format!("Failed to load project in {}", dir.display()))?;
    let report = merge_web_xml::merge_web_xml(&config, &project)?;
    OutputFormatter::new(args.project.format.into()).format_merge(&report)
}

pub fn handle_classpath(args: &ClasspathArgs) -> i32 {
    finish(print_classpath(args))
}

fn print_classpath(args: &ClasspathArgs) -> Result<String> {
    let scope: ClasspathScope = args.scope.parse()?;
    let ctx = prepare(&args.project, |_| {})?;
    let classpath = ctx.classpath(scope, !args.no_sources, true);
    OutputFormatter::new(args.project.format.into()).format_classpath(scope, &classpath)
}

pub fn handle_modules(args: &ProjectArgs) -> i32 {
    finish(list_modules(args))
}

fn list_modules(args: &ProjectArgs) -> Result<String> {
    let dir = project_dir(args)?;
    let config = load_config(args, &dir)?;
    let project = ProjectModel::load(&dir)
        .with_context(|| format!("Failed to load project in {}", dir.display()))?;
    let loader = goals::module_loader(&project);
    let modules = loader
        .discover()?
        .iter()
        .filter(|name| config.modules.is_empty() || config.modules.contains(*name))
        .map(|name| loader.read(name))
        .collect::<crate::error::Result<Vec<_>>>()?;
    OutputFormatter::new(args.format.into()).format_modules(&modules)
}

pub fn handle_resolve(args: &ProjectArgs) -> i32 {
    finish(resolve_runtime(args))
}

fn resolve_runtime(args: &ProjectArgs) -> Result<String> {
    let ctx = prepare(args, |_| {})?;
    OutputFormatter::new(args.format.into()).format_runtime(&ctx.runtime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::commands::OutputFormatArg;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn project_args(dir: &Path) -> ProjectArgs {
        ProjectArgs {
            project: Some(dir.to_path_buf()),
            format: OutputFormatArg::Json,
            gwt_home: None,
            gwt_version: None,
            offline: false,
        }
    }

    #[test]
    #[serial]
    fn test_cli_flags_override_config() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("gwtpipe.toml"), "offline = false\ngwt-version = \"1.6.4\"\n").unwrap();

        let mut args = project_args(temp.path());
        args.offline = true;
        args.gwt_version = Some("2.0.0".to_string());

        let config = load_config(&args, temp.path()).unwrap();
        assert!(config.offline);
        assert_eq!(config.gwt_version.as_deref(), Some("2.0.0"));
    }

    #[test]
    #[serial]
    fn test_missing_project_exits_with_one() {
        let temp = TempDir::new().unwrap();
        assert_eq!(handle_modules(&project_args(temp.path())), 1);
    }

    #[test]
    #[serial]
    fn test_unsupported_scope_exits_with_one() {
        let temp = TempDir::new().unwrap();
        let args = ClasspathArgs {
            project: project_args(temp.path()),
            scope: "system".to_string(),
            no_sources: false,
        };
        assert_eq!(handle_classpath(&args), 1);
    }
}
