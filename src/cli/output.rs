//! Output formatting for goal reports
//!
//! Every report serializes to JSON or YAML as-is; the human format is
//! written by hand per report.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::classpath::{Classpath, ClasspathScope};
use crate::goals::compile::CompileReport;
use crate::goals::merge_web_xml::MergeReport;
use crate::goals::run::RunReport;
use crate::goals::test::TestReport;
use crate::module::ModuleDescriptor;
use crate::process::Outcome;
use crate::runtime::RuntimeDescriptor;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn structured<T: Serialize>(&self, value: &T, what: &str) -> Option<Result<String>> {
        match self.format {
            OutputFormat::Json => Some(
                serde_json::to_string_pretty(value)
                    .with_context(|| format!("Failed to serialize {} to JSON", what)),
            ),
            OutputFormat::Yaml => Some(
                serde_yaml::to_string(value)
                    .with_context(|| format!("Failed to serialize {} to YAML", what)),
            ),
            OutputFormat::Human => None,
        }
    }

    pub fn format_compile(&self, report: &CompileReport) -> Result<String> {
        if let Some(out) = self.structured(report, "compile report") {
            return out;
        }
        let mut output = header("GWT Compile");
        output.push_str(&format!("GWT Version:  {}\n", report.version));
        output.push_str(&format!("Output:       {}\n\n", report.output_directory.display()));
        push_list(&mut output, "Compiled", &report.compiled);
        push_list(&mut output, "Up to date", &report.up_to_date);
        push_list(&mut output, "Libraries (skipped)", &report.skipped_libraries);
        output.push_str(&format!("Compiler invocations: {}\n", report.invocations));
        Ok(output)
    }

    pub fn format_test(&self, report: &TestReport) -> Result<String> {
        if let Some(out) = self.structured(report, "test report") {
            return out;
        }
        let mut output = header("GWT Tests");
        if report.skipped {
            output.push_str("Tests are skipped.\n");
            return Ok(output);
        }
        if report.results.is_empty() {
            output.push_str("No tests to run.\n");
            return Ok(output);
        }
        for (i, result) in report.results.iter().enumerate() {
            let connector = if i == report.results.len() - 1 {
                "\u{2514}"
            } else {
                "\u{251C}"
            };
            let mark = match result.outcome {
                Outcome::Success => "\u{2713}",
                Outcome::Failure | Outcome::Error => "\u{2717}",
            };
            output.push_str(&format!(
                "{}\u{2500} {} {} ({}, {:.2}s)\n",
                connector, mark, result.class_name, result.outcome, result.elapsed_secs
            ));
        }
        output.push_str(&format!(
            "\nTests run: {}, Failures: {}, Errors: {}\n",
            report.tests_run(),
            report.failures(),
            report.errors()
        ));
        if let Some(dir) = &report.report_directory {
            output.push_str(&format!("Reports: {}\n", dir.display()));
        }
        Ok(output)
    }

    pub fn format_run(&self, report: &RunReport) -> Result<String> {
        if let Some(out) = self.structured(report, "run report") {
            return out;
        }
        let mut output = header("Hosted Mode");
        output.push_str(&format!("Module:   {}\n", report.module));
        output.push_str(&format!("Shell:    {}\n", report.shell_class));
        output.push_str(&format!("Output:   {}\n", report.output_directory.display()));
        if report.copied_libraries > 0 {
            output.push_str(&format!("Copied {} jar(s) into WEB-INF/lib\n", report.copied_libraries));
        }
        output.push_str(&format!("Outcome:  {}\n", report.outcome));
        Ok(output)
    }

    pub fn format_merge(&self, report: &MergeReport) -> Result<String> {
        if let Some(out) = self.structured(report, "merge report") {
            return out;
        }
        let mut output = header("Deployment Descriptor");
        output.push_str(&format!("Source:  {}\n", report.source.display()));
        output.push_str(&format!("Target:  {}\n\n", report.target.display()));
        if report.servlets.is_empty() {
            output.push_str("No module servlets.\n");
        } else {
            output.push_str("Module servlets:\n");
            for servlet in &report.servlets {
                output.push_str(&format!(
                    "\u{251C}\u{2500} {} \u{2192} {}\n",
                    servlet.url_pattern, servlet.class
                ));
            }
        }
        output.push_str(&format!("\n{} servlet(s) declared\n", report.declared));
        Ok(output)
    }

    /// Human format is the joined classpath, ready to paste into a shell
    pub fn format_classpath(&self, scope: ClasspathScope, classpath: &Classpath) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "scope": scope.to_string(),
                "entries": classpath,
            }))
            .context("Failed to serialize classpath to JSON"),
            OutputFormat::Yaml => serde_yaml::to_string(&serde_json::json!({
                "scope": scope.to_string(),
                "entries": classpath,
            }))
            .context("Failed to serialize classpath to YAML"),
            OutputFormat::Human => Ok(format!("{}\n", classpath.join())),
        }
    }

    pub fn format_modules(&self, modules: &[ModuleDescriptor]) -> Result<String> {
        if let Some(out) = self.structured(&modules, "modules") {
            return out;
        }
        let mut output = String::new();
        for module in modules {
            let kind = if module.is_library() { "library" } else { "application" };
            output.push_str(&format!("{} ({})\n", module.qualified_name, kind));
            if let Some(rename) = &module.rename_to {
                output.push_str(&format!("\u{251C}\u{2500} Output:       {}\n", rename));
            }
            for entry in &module.entry_points {
                output.push_str(&format!("\u{251C}\u{2500} Entry point:  {}\n", entry));
            }
            for (path, class) in &module.servlets {
                output.push_str(&format!("\u{251C}\u{2500} Servlet:      {} \u{2192} {}\n", path, class));
            }
            output.push_str(&format!(
                "\u{2514}\u{2500} Sources:      {}\n",
                module.source_packages().join(", ")
            ));
        }
        if modules.is_empty() {
            output.push_str("No GWT modules found.\n");
        }
        Ok(output)
    }

    pub fn format_runtime(&self, runtime: &RuntimeDescriptor) -> Result<String> {
        if let Some(out) = self.structured(runtime, "runtime") {
            return out;
        }
        let caps = runtime.capabilities();
        let mut output = header("GWT Toolchain");
        output.push_str(&format!("Version:   {} ({})\n", runtime.raw_version, runtime.version));
        output.push_str(&format!("User jar:  {}\n", runtime.user_jar.display()));
        output.push_str(&format!("Dev jar:   {}\n", runtime.dev_jar.display()));
        if let Some(servlet) = &runtime.servlet_jar {
            output.push_str(&format!("Servlet:   {}\n", servlet.display()));
        }
        output.push_str("\nCapabilities:\n");
        output.push_str(&format!("\u{251C}\u{2500} Compiler:      {}\n", caps.compiler_class));
        output.push_str(&format!("\u{251C}\u{2500} Shell:         {}\n", caps.shell_class));
        output.push_str(&format!("\u{251C}\u{2500} Output flag:   {}\n", caps.web_output_argument));
        output.push_str(&format!(
            "\u{251C}\u{2500} Multi-module:  {}\n",
            yes_no(caps.supports_multi_module_compile)
        ));
        output.push_str(&format!(
            "\u{251C}\u{2500} Local workers: {}\n",
            yes_no(caps.supports_parallel_build)
        ));
        output.push_str(&format!(
            "\u{2514}\u{2500} Extras:        {}\n",
            yes_no(caps.supports_compiler_extras)
        ));
        Ok(output)
    }
}

fn header(title: &str) -> String {
    format!("\u{2713} {}\n{}\n\n", title, RULE)
}

fn push_list(output: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    output.push_str(&format!("{}:\n", title));
    for (i, item) in items.iter().enumerate() {
        let connector = if i == items.len() - 1 { "\u{2514}" } else { "\u{251C}" };
        output.push_str(&format!("{}\u{2500} {}\n", connector, item));
    }
    output.push('\n');
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::VersionTag;
    use std::path::PathBuf;

    fn compile_report() -> CompileReport {
        CompileReport {
            version: VersionTag::Future,
            output_directory: PathBuf::from("/p/target/app-1.0"),
            compiled: vec!["com.example.App".to_string()],
            up_to_date: vec![],
            skipped_libraries: vec!["com.example.Shared".to_string()],
            invocations: 1,
        }
    }

    #[test]
    fn test_compile_json() {
        let out = OutputFormatter::new(OutputFormat::Json)
            .format_compile(&compile_report())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["compiled"][0], "com.example.App");
        assert_eq!(value["invocations"], 1);
    }

    #[test]
    fn test_compile_human() {
        let out = OutputFormatter::new(OutputFormat::Human)
            .format_compile(&compile_report())
            .unwrap();
        assert!(out.contains("GWT Compile"));
        assert!(out.contains("\u{2514}\u{2500} com.example.App"));
        assert!(out.contains("Libraries (skipped)"));
        assert!(!out.contains("Up to date"));
    }

    #[test]
    fn test_classpath_human_is_joined() {
        let mut cp = Classpath::new();
        cp.add("/a");
        cp.add("/b");
        let out = OutputFormatter::new(OutputFormat::Human)
            .format_classpath(ClasspathScope::Compile, &cp)
            .unwrap();
        assert_eq!(out.trim_end(), cp.join());
    }

    #[test]
    fn test_classpath_yaml() {
        let mut cp = Classpath::new();
        cp.add("/a");
        let out = OutputFormatter::new(OutputFormat::Yaml)
            .format_classpath(ClasspathScope::Test, &cp)
            .unwrap();
        assert!(out.contains("scope: test"));
        assert!(out.contains("- /a"));
    }

    #[test]
    fn test_modules_human_lists_servlets() {
        let module = ModuleDescriptor::parse(
            "com.example.App",
            "<module rename-to='app'><entry-point class='com.example.client.App'/>\
             <servlet path='/rpc' class='com.example.Rpc'/></module>",
        )
        .unwrap();
        let out = OutputFormatter::new(OutputFormat::Human)
            .format_modules(&[module])
            .unwrap();
        assert!(out.starts_with("com.example.App (application)"));
        assert!(out.contains("/rpc \u{2192} com.example.Rpc"));
        assert!(out.contains("Sources:      com.example.client\n"));
    }

    #[test]
    fn test_empty_modules() {
        let out = OutputFormatter::new(OutputFormat::Human)
            .format_modules(&[])
            .unwrap();
        assert_eq!(out, "No GWT modules found.\n");
    }
}
