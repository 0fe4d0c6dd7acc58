use gwtpipe::cli::commands::{CliArgs, Commands};
use gwtpipe::cli::handlers::{
    handle_classpath, handle_compile, handle_merge_web_xml, handle_modules, handle_resolve,
    handle_run, handle_test,
};
use gwtpipe::util::logging::{init_logging, LoggingConfig};
use gwtpipe::VERSION;

use clap::Parser;
use tracing::debug;

fn main() {
    let args = CliArgs::parse();
    init_logging(LoggingConfig::from_args(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    debug!("gwtpipe v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Compile(compile_args) => handle_compile(compile_args),
        Commands::Test(test_args) => handle_test(test_args),
        Commands::Run(run_args) => handle_run(run_args),
        Commands::MergeWebXml(merge_args) => handle_merge_web_xml(merge_args),
        Commands::Classpath(classpath_args) => handle_classpath(classpath_args),
        Commands::Modules(project_args) => handle_modules(project_args),
        Commands::Resolve(project_args) => handle_resolve(project_args),
    };

    std::process::exit(exit_code);
}
