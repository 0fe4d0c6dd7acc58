use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Build pipeline for GWT applications
#[derive(Parser, Debug)]
#[command(
    name = "gwtpipe",
    about = "Build pipeline for GWT applications",
    version,
    author,
    long_about = "gwtpipe resolves a GWT toolchain for a Maven project, compiles its modules \
                  to JavaScript, runs GWT tests, launches hosted mode and merges module \
                  servlets into the web application's deployment descriptor."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Compile GWT modules to JavaScript",
        long_about = "Compiles every application module whose output is missing or older than \
                      its sources. Library modules are skipped.\n\n\
                      Examples:\n  \
                      gwtpipe compile\n  \
                      gwtpipe compile --module com.example.App --style PRETTY\n  \
                      gwtpipe compile --force --format json"
    )]
    Compile(CompileArgs),

    #[command(
        about = "Run GWT tests",
        long_about = "Runs every test class matching the include patterns with the JUnit \
                      text runner and writes one report per class.\n\n\
                      Examples:\n  \
                      gwtpipe test\n  \
                      gwtpipe test --web-mode --include '**/GwtTest*Suite.java'"
    )]
    Test(TestArgs),

    #[command(about = "Launch the hosted-mode shell")]
    Run(RunArgs),

    #[command(about = "Declare module servlets in the web application's web.xml")]
    MergeWebXml(MergeWebXmlArgs),

    #[command(about = "Print the classpath for a scope")]
    Classpath(ClasspathArgs),

    #[command(about = "List GWT modules found in the project's source roots")]
    Modules(ProjectArgs),

    #[command(about = "Resolve the GWT toolchain and show what was found")]
    Resolve(ProjectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[arg(
        short = 'p',
        long,
        value_name = "DIR",
        help = "Project directory containing pom.xml (defaults to current directory)"
    )]
    pub project: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(long, value_name = "DIR", help = "GWT distribution directory")]
    pub gwt_home: Option<PathBuf>,

    #[arg(long, value_name = "VERSION", help = "GWT version to resolve from the repository")]
    pub gwt_version: Option<String>,

    #[arg(long, help = "Never download artifacts")]
    pub offline: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[arg(short = 'm', long = "module", value_name = "MODULE", help = "Module to compile (repeatable)")]
    pub modules: Vec<String>,

    #[arg(long, value_name = "STYLE", help = "Output style: OBF, PRETTY or DETAILED")]
    pub style: Option<String>,

    #[arg(long, help = "Recompile even when output is up to date")]
    pub force: bool,

    #[arg(long, value_name = "N", help = "Number of local compile workers")]
    pub local_workers: Option<u32>,

    #[arg(long, help = "Compile quickly with minimal optimizations")]
    pub draft: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TestArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[arg(long = "include", value_name = "GLOB", help = "Test source pattern (repeatable)")]
    pub includes: Vec<String>,

    #[arg(long, help = "Run tests against compiled JavaScript")]
    pub web_mode: bool,

    #[arg(long, help = "Do not fail when tests fail")]
    pub ignore_failures: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[arg(short = 'm', long, value_name = "MODULE", help = "Module to run")]
    pub module: Option<String>,

    #[arg(long, value_name = "PORT", help = "Embedded server port")]
    pub port: Option<u16>,

    #[arg(long, help = "Do not start the embedded server")]
    pub no_server: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MergeWebXmlArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[arg(long, value_name = "FILE", help = "Source web.xml")]
    pub web_xml: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ClasspathArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[arg(
        short = 's',
        long,
        default_value = "compile",
        help = "Scope: compile, runtime or test"
    )]
    pub scope: String,

    #[arg(long, help = "Leave source roots off the classpath")]
    pub no_sources: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
