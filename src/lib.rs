//! gwtpipe - build pipeline for GWT applications
//!
//! Resolves a GWT toolchain for a Maven project and drives the GWT tools
//! (compiler, hosted-mode shell, JUnit test runner) as child JVM processes.
//!
//! # Core Concepts
//!
//! - **Runtime**: the resolved `gwt-user`/`gwt-dev` jars plus the version
//!   bucket that decides which command-line options the tools accept
//! - **Classpath**: ordered, deduplicated path set for a scope, with the GWT
//!   jars always last
//! - **Module**: a `*.gwt.xml` descriptor; modules without an entry point are
//!   libraries and are never compiled on their own
//! - **Goals**: `compile`, `test`, `run` and `merge-web-xml`, each a function
//!   over a [`goals::GoalContext`]
//!
//! # Example Usage
//!
//! ```no_run
//! use gwtpipe::config::PipelineConfig;
//! use gwtpipe::goals::{compile, GoalContext};
//! use std::path::Path;
//!
//! # fn main() -> gwtpipe::Result<()> {
//! let dir = Path::new("my-app");
//! let config = PipelineConfig::load(dir).expect("valid configuration");
//! let ctx = GoalContext::prepare(config, dir)?;
//! let report = compile::compile(&ctx)?;
//! println!("compiled {:?}", report.compiled);
//! # Ok(())
//! # }
//! ```

pub mod classpath;
pub mod cli;
pub mod config;
pub mod error;
pub mod goals;
pub mod module;
pub mod process;
pub mod project;
pub mod runtime;
pub mod staleness;
pub mod util;
pub mod webxml;

pub use classpath::{Classpath, ClasspathBuilder, ClasspathScope};
pub use config::{ConfigError, PipelineConfig};
pub use error::{PipelineError, Result};
pub use module::{ModuleDescriptor, ModuleLoader};
pub use process::{JavaCommand, ProcessResult};
pub use runtime::{ArtifactResolver, RuntimeDescriptor, VersionTag};
pub use staleness::StalenessChecker;
pub use util::{init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
