use super::GoalContext;
use crate::classpath::ClasspathScope;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::runtime::{Capabilities, VersionTag};
use crate::staleness::StalenessChecker;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct CompileReport {
    pub version: VersionTag,
    pub output_directory: PathBuf,
    pub compiled: Vec<String>,
    pub up_to_date: Vec<String>,
    pub skipped_libraries: Vec<String>,
    /// Number of compiler processes launched
    pub invocations: usize,
}

/// Compiler command-line arguments, minus options the version cannot handle
pub fn compiler_arguments(
    config: &PipelineConfig,
    caps: &Capabilities,
    gen_dir: &Path,
    output_dir: &Path,
    extra_dir: &Path,
    modules: &[&str],
) -> Vec<String> {
    let mut args = vec![
        "-gen".to_string(),
        gen_dir.display().to_string(),
        "-logLevel".to_string(),
        config.gwt_log_level.clone(),
        "-style".to_string(),
        config.style.clone(),
    ];

    let mut dropped = Vec::new();
    if config.enable_assertions {
        if caps.supports_compiler_extras {
            args.push("-ea".to_string());
        } else {
            dropped.push("-ea");
        }
    }

    args.push(caps.web_output_argument.to_string());
    args.push(output_dir.display().to_string());

    if let Some(workers) = config.local_workers {
        if caps.supports_parallel_build {
            args.push("-localWorkers".to_string());
            args.push(workers.to_string());
        } else {
            dropped.push("-localWorkers");
        }
    }

    let extras: [(bool, &str); 5] = [
        (config.soyc, "-soyc"),
        (config.draft_compile, "-draftCompile"),
        (config.validate_only, "-validateOnly"),
        (config.disable_class_metadata, "-XdisableClassMetadata"),
        (config.disable_cast_checking, "-XdisableCastChecking"),
    ];
    for (enabled, flag) in extras {
        if !enabled {
            continue;
        }
        if !caps.supports_compiler_extras {
            dropped.push(flag);
            continue;
        }
        args.push(flag.to_string());
        if flag == "-soyc" {
            args.push("-extra".to_string());
            args.push(extra_dir.display().to_string());
        }
    }

    if config.tree_logger {
        args.push("-treeLogger".to_string());
    }

    for option in dropped {
        warn!(option, compiler = caps.compiler_class, "Option not supported by this GWT version, ignoring");
    }

    args.extend(modules.iter().map(|m| m.to_string()));
    args
}

/// Compile every target module whose output is missing or stale.
pub fn compile(ctx: &GoalContext) -> Result<CompileReport> {
    let config = &ctx.config;
    let project = &ctx.project;
    let caps = ctx.runtime.capabilities();
    let output_dir = config.web_output(project);

    let mut report = CompileReport {
        version: ctx.runtime.version,
        output_directory: output_dir.clone(),
        compiled: Vec::new(),
        up_to_date: Vec::new(),
        skipped_libraries: Vec::new(),
        invocations: 0,
    };

    let checker = StalenessChecker::new(project.all_source_roots()).with_force(config.force);
    let mut targets = Vec::new();
    for module in ctx.target_modules()? {
        if module.is_library() {
            info!(module = %module.qualified_name, "Skipping library module");
            report.skipped_libraries.push(module.qualified_name);
        } else if checker.is_recompilation_required(&module, &output_dir)? {
            targets.push(module.qualified_name);
        } else {
            info!(module = %module.qualified_name, "Compiled output is up to date");
            report.up_to_date.push(module.qualified_name);
        }
    }
    if targets.is_empty() {
        return Ok(report);
    }

    fs::create_dir_all(&output_dir)?;
    let gen_dir = config.gen_dir(project);
    let extra_dir = config.extra_dir(project);
    let classpath = ctx.classpath(ClasspathScope::Compile, true, true);

    let batches: Vec<Vec<&str>> = if caps.supports_multi_module_compile {
        vec![targets.iter().map(String::as_str).collect()]
    } else {
        targets.iter().map(|t| vec![t.as_str()]).collect()
    };

    for batch in batches {
        info!(modules = ?batch, compiler = caps.compiler_class, "Compiling");
        let args = compiler_arguments(config, caps, &gen_dir, &output_dir, &extra_dir, &batch);
        let result = ctx
            .java(caps.compiler_class)
            .classpath(classpath.clone())
            .args(args)
            .execute()?;
        if !result.is_success() {
            warn!(
                last_line = result.last_line.as_deref().unwrap_or(""),
                "Compiler exited cleanly but reported a problem"
            );
        }
        report.invocations += 1;
    }

    report.compiled = targets;
    Ok(report)
}
