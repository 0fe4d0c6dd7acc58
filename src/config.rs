//! Pipeline configuration.
//!
//! Settings are layered, later sources winning:
//!
//! 1. built-in defaults
//! 2. `gwtpipe.toml` in the project directory
//! 3. `GWTPIPE_*` environment variables (and `JAVA_HOME`)
//! 4. command-line flags, applied by the CLI handlers
//!
//! # Environment Variables
//!
//! - `GWTPIPE_GWT_HOME`: local GWT distribution, skips repository resolution
//! - `GWTPIPE_GWT_VERSION`: GWT version to fetch
//! - `GWTPIPE_LOCAL_REPOSITORY`: default `~/.m2/repository`
//! - `GWTPIPE_REMOTE_REPOSITORY`: default Maven Central
//! - `GWTPIPE_OFFLINE`: never download (true|false)
//! - `GWTPIPE_STYLE`: compiler output style (OBF|PRETTY|DETAILED)
//! - `GWTPIPE_GWT_LOG_LEVEL`: log level passed to the GWT tools
//! - `GWTPIPE_CLASSPATH_STRATEGY`: inline|arg-file|manifest-booter
//! - `GWTPIPE_TIMEOUT`: child process timeout in seconds, 0 disables
//! - `GWTPIPE_LOCAL_WORKERS`: `-localWorkers` for the compiler
//! - `GWTPIPE_FORCE`: recompile even when output is up to date
//!
//! # Example `gwtpipe.toml`
//!
//! ```toml
//! gwt-version = "2.0.3"
//! style = "PRETTY"
//! modules = ["com.example.App"]
//! classpath-strategy = "manifest-booter"
//! jvm-args = ["-Xmx1g", "-Xss16m"]
//! ```

use crate::process::{default_java, ClasspathStrategy};
use crate::project::ProjectModel;
use crate::runtime::repository::{Repository, DEFAULT_REMOTE_REPOSITORY};
use crate::runtime::Platform;
use crate::webxml::ServletPathMode;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "gwtpipe.toml";

const DEFAULT_GWT_LOG_LEVEL: &str = "INFO";
const DEFAULT_STYLE: &str = "OBF";
const DEFAULT_PORT: u16 = 8888;
const DEFAULT_RUN_TARGET: &str = "index.html";
const DEFAULT_TEST_INCLUDE: &str = "**/GwtTest*.java";
const DEFAULT_WEB_XML: &str = "src/main/webapp/WEB-INF/web.xml";

const GWT_LOG_LEVELS: &[&str] = &["ERROR", "WARN", "INFO", "TRACE", "DEBUG", "SPAM", "ALL"];
const STYLES: &[&str] = &["OBF", "OBFUSCATED", "PRETTY", "DETAILED"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value '{value}' for {key}")]
    InvalidEnv { key: String, value: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PipelineConfig {
    pub gwt_home: Option<PathBuf>,
    pub gwt_version: Option<String>,
    pub local_repository: PathBuf,
    pub remote_repository: String,
    pub offline: bool,
    pub platform: Platform,

    /// Explicit `java` executable; otherwise `$JAVA_HOME/bin/java`, then `PATH`
    pub java: Option<PathBuf>,
    pub java_home: Option<PathBuf>,
    pub jvm_args: Vec<String>,
    pub classpath_strategy: ClasspathStrategy,
    /// Seconds before a child process is killed; `None` waits forever
    pub timeout_secs: Option<u64>,
    /// Defaults to `<build directory>/gwtpipe`
    pub scratch_directory: Option<PathBuf>,

    /// Modules to compile or run; empty means every module found in the sources
    pub modules: Vec<String>,
    /// Web output; defaults to `<build directory>/<final name>`
    pub output_directory: Option<PathBuf>,
    /// Generated sources; defaults to `<build directory>/.generated`
    pub gen_directory: Option<PathBuf>,
    /// Compile reports; defaults to `<build directory>/extra`
    pub extra_directory: Option<PathBuf>,
    pub gwt_log_level: String,
    pub style: String,
    pub enable_assertions: bool,
    pub local_workers: Option<u32>,
    pub soyc: bool,
    pub draft_compile: bool,
    pub validate_only: bool,
    pub tree_logger: bool,
    pub disable_class_metadata: bool,
    pub disable_cast_checking: bool,
    pub force: bool,

    pub test_includes: Vec<String>,
    pub test_excludes: Vec<String>,
    pub test_failure_ignore: bool,
    pub skip_tests: bool,
    /// Run tests in web (compiled JavaScript) mode rather than hosted mode
    pub test_web_mode: bool,
    /// Defaults to `<build directory>/surefire-reports`
    pub test_report_directory: Option<PathBuf>,

    pub run_target: String,
    pub port: u16,
    pub no_server: bool,

    /// Source descriptor, relative to the project directory
    pub web_xml: PathBuf,
    pub servlet_path_mode: ServletPathMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            gwt_home: None,
            gwt_version: None,
            local_repository: default_local_repository(),
            remote_repository: DEFAULT_REMOTE_REPOSITORY.to_string(),
            offline: false,
            platform: Platform::current(),
            java: None,
            java_home: None,
            jvm_args: vec!["-Xmx512m".to_string()],
            classpath_strategy: ClasspathStrategy::Inline,
            timeout_secs: None,
            scratch_directory: None,
            modules: Vec::new(),
            output_directory: None,
            gen_directory: None,
            extra_directory: None,
            gwt_log_level: DEFAULT_GWT_LOG_LEVEL.to_string(),
            style: DEFAULT_STYLE.to_string(),
            enable_assertions: false,
            local_workers: None,
            soyc: false,
            draft_compile: false,
            validate_only: false,
            tree_logger: false,
            disable_class_metadata: false,
            disable_cast_checking: false,
            force: false,
            test_includes: vec![DEFAULT_TEST_INCLUDE.to_string()],
            test_excludes: Vec::new(),
            test_failure_ignore: false,
            skip_tests: false,
            test_web_mode: false,
            test_report_directory: None,
            run_target: DEFAULT_RUN_TARGET.to_string(),
            port: DEFAULT_PORT,
            no_server: false,
            web_xml: PathBuf::from(DEFAULT_WEB_XML),
            servlet_path_mode: ServletPathMode::ModulePrefixed,
        }
    }
}

fn default_local_repository() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".m2").join("repository"))
        .unwrap_or_else(|| PathBuf::from(".m2/repository"))
}

impl PipelineConfig {
    /// Defaults, then `gwtpipe.toml` in `project_dir` if present, then environment.
    pub fn load(project_dir: &Path) -> Result<Self, ConfigError> {
        let path = project_dir.join(CONFIG_FILE_NAME);
        let mut config = if path.is_file() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = env::var("GWTPIPE_GWT_HOME") {
            self.gwt_home = Some(PathBuf::from(v));
        }
        if let Ok(v) = env::var("GWTPIPE_GWT_VERSION") {
            self.gwt_version = Some(v);
        }
        if let Ok(v) = env::var("GWTPIPE_LOCAL_REPOSITORY") {
            self.local_repository = PathBuf::from(v);
        }
        if let Ok(v) = env::var("GWTPIPE_REMOTE_REPOSITORY") {
            self.remote_repository = v;
        }
        if let Some(v) = parse_env::<bool>("GWTPIPE_OFFLINE")? {
            self.offline = v;
        }
        if let Ok(v) = env::var("GWTPIPE_STYLE") {
            self.style = v.to_uppercase();
        }
        if let Ok(v) = env::var("GWTPIPE_GWT_LOG_LEVEL") {
            self.gwt_log_level = v.to_uppercase();
        }
        if let Ok(v) = env::var("GWTPIPE_CLASSPATH_STRATEGY") {
            self.classpath_strategy =
                parse_strategy(&v).ok_or_else(|| ConfigError::InvalidEnv {
                    key: "GWTPIPE_CLASSPATH_STRATEGY".to_string(),
                    value: v.clone(),
                })?;
        }
        if let Some(v) = parse_env::<u64>("GWTPIPE_TIMEOUT")? {
            self.timeout_secs = (v > 0).then_some(v);
        }
        if let Some(v) = parse_env::<u32>("GWTPIPE_LOCAL_WORKERS")? {
            self.local_workers = Some(v);
        }
        if let Some(v) = parse_env::<bool>("GWTPIPE_FORCE")? {
            self.force = v;
        }
        if self.java_home.is_none() {
            self.java_home = env::var_os("JAVA_HOME").map(PathBuf::from);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !GWT_LOG_LEVELS.contains(&self.gwt_log_level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid GWT log level: {}. Valid options: {}",
                self.gwt_log_level,
                GWT_LOG_LEVELS.join(", ")
            )));
        }
        if !STYLES.contains(&self.style.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid style: {}. Valid options: OBF, PRETTY, DETAILED",
                self.style
            )));
        }
        if self.local_workers == Some(0) {
            return Err(ConfigError::ValidationFailed(
                "local-workers must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::ValidationFailed(
                "timeout-secs must be at least 1; omit it to wait forever".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(ConfigError::ValidationFailed("port must not be 0".to_string()));
        }
        if !self.offline
            && !(self.remote_repository.starts_with("http://")
                || self.remote_repository.starts_with("https://"))
        {
            return Err(ConfigError::ValidationFailed(format!(
                "Remote repository must be an http(s) URL: {}",
                self.remote_repository
            )));
        }
        if self.test_includes.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "test-includes must name at least one pattern".to_string(),
            ));
        }
        Ok(())
    }

    pub fn repository(&self) -> Repository {
        if self.offline {
            Repository::offline(&self.local_repository)
        } else {
            Repository::new(&self.local_repository, &self.remote_repository)
        }
    }

    pub fn java_executable(&self) -> PathBuf {
        self.java
            .clone()
            .unwrap_or_else(|| default_java(self.java_home.as_deref()))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn web_output(&self, project: &ProjectModel) -> PathBuf {
        self.output_directory
            .as_deref()
            .map(|p| path_in(project, p))
            .unwrap_or_else(|| project.build_directory.join(&project.final_name))
    }

    pub fn gen_dir(&self, project: &ProjectModel) -> PathBuf {
        self.gen_directory
            .as_deref()
            .map(|p| path_in(project, p))
            .unwrap_or_else(|| project.build_directory.join(".generated"))
    }

    pub fn extra_dir(&self, project: &ProjectModel) -> PathBuf {
        self.extra_directory
            .as_deref()
            .map(|p| path_in(project, p))
            .unwrap_or_else(|| project.build_directory.join("extra"))
    }

    pub fn scratch_dir(&self, project: &ProjectModel) -> PathBuf {
        self.scratch_directory
            .as_deref()
            .map(|p| path_in(project, p))
            .unwrap_or_else(|| project.build_directory.join("gwtpipe"))
    }

    pub fn report_dir(&self, project: &ProjectModel) -> PathBuf {
        self.test_report_directory
            .as_deref()
            .map(|p| path_in(project, p))
            .unwrap_or_else(|| project.build_directory.join("surefire-reports"))
    }

    pub fn web_xml_source(&self, project: &ProjectModel) -> PathBuf {
        path_in(project, &self.web_xml)
    }
}

/// `path` as given when absolute, otherwise under the project directory
fn path_in(project: &ProjectModel, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project.base_dir.join(path)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

pub fn parse_strategy(value: &str) -> Option<ClasspathStrategy> {
    match value.trim().to_lowercase().as_str() {
        "inline" => Some(ClasspathStrategy::Inline),
        "arg-file" | "argfile" => Some(ClasspathStrategy::ArgFile),
        "manifest-booter" | "manifest" => Some(ClasspathStrategy::ManifestBooter),
        _ => None,
    }
}

impl fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "gwtpipe Configuration:")?;
        match (&self.gwt_home, &self.gwt_version) {
            (Some(home), _) => writeln!(f, "  GWT Home: {}", home.display())?,
            (None, Some(version)) => writeln!(f, "  GWT Version: {}", version)?,
            (None, None) => writeln!(f, "  GWT Version: (from project dependencies)")?,
        }
        writeln!(f, "  Local Repository: {}", self.local_repository.display())?;
        if self.offline {
            writeln!(f, "  Remote Repository: (offline)")?;
        } else {
            writeln!(f, "  Remote Repository: {}", self.remote_repository)?;
        }
        writeln!(f, "  Platform: {}", self.platform.classifier())?;
        writeln!(f, "  Java: {}", self.java_executable().display())?;
        writeln!(f, "  Classpath Strategy: {:?}", self.classpath_strategy)?;
        if let Some(secs) = self.timeout_secs {
            writeln!(f, "  Timeout: {}s", secs)?;
        }
        writeln!(f, "  Style: {}", self.style)?;
        writeln!(f, "  GWT Log Level: {}", self.gwt_log_level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.style, "OBF");
        assert_eq!(config.test_includes, vec!["**/GwtTest*.java"]);
        assert_eq!(config.classpath_strategy, ClasspathStrategy::Inline);
        assert!(config.local_repository.ends_with(".m2/repository"));
    }

    #[test]
    #[serial]
    fn test_load_without_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::load(dir.path()).unwrap();
        assert_eq!(config.port, 8888);
        assert!(config.modules.is_empty());
    }

    #[test]
    #[serial]
    fn test_load_reads_toml() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
gwt-version = "1.6.4"
style = "PRETTY"
modules = ["com.example.App"]
classpath-strategy = "manifest-booter"
servlet-path-mode = "as-is"
timeout-secs = 120
"#,
        )
        .unwrap();

        let config = PipelineConfig::load(dir.path()).unwrap();
        assert_eq!(config.gwt_version.as_deref(), Some("1.6.4"));
        assert_eq!(config.style, "PRETTY");
        assert_eq!(config.modules, vec!["com.example.App"]);
        assert_eq!(config.classpath_strategy, ClasspathStrategy::ManifestBooter);
        assert_eq!(config.servlet_path_mode, ServletPathMode::AsIs);
        assert_eq!(config.timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.port, 8888);
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "style = \"PRETTY\"\n").unwrap();
        let _guards = vec![
            EnvGuard::set("GWTPIPE_STYLE", "detailed"),
            EnvGuard::set("GWTPIPE_OFFLINE", "true"),
            EnvGuard::set("GWTPIPE_CLASSPATH_STRATEGY", "arg-file"),
            EnvGuard::set("GWTPIPE_TIMEOUT", "0"),
        ];

        let config = PipelineConfig::load(dir.path()).unwrap();
        assert_eq!(config.style, "DETAILED");
        assert!(config.offline);
        assert!(config.repository().is_offline());
        assert_eq!(config.classpath_strategy, ClasspathStrategy::ArgFile);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    #[serial]
    fn test_invalid_env_value() {
        let dir = TempDir::new().unwrap();
        let _guard = EnvGuard::set("GWTPIPE_LOCAL_WORKERS", "many");
        match PipelineConfig::load(dir.path()) {
            Err(ConfigError::InvalidEnv { key, value }) => {
                assert_eq!(key, "GWTPIPE_LOCAL_WORKERS");
                assert_eq!(value, "many");
            }
            other => panic!("Expected InvalidEnv, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_malformed_toml() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "style = [").unwrap();
        assert!(matches!(
            PipelineConfig::load(dir.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.style = "UGLY".to_string();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.local_workers = Some(0);
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.remote_repository = "ftp://mirror".to_string();
        assert!(config.validate().is_err());
        config.offline = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_paths_resolve_against_project() {
        let project = ProjectModel::new("g", "app", "1.0", Path::new("/work/app"));
        let mut config = PipelineConfig::default();

        assert_eq!(config.web_output(&project), PathBuf::from("/work/app/target/app-1.0"));
        assert_eq!(config.gen_dir(&project), PathBuf::from("/work/app/target/.generated"));
        assert_eq!(
            config.web_xml_source(&project),
            PathBuf::from("/work/app/src/main/webapp/WEB-INF/web.xml")
        );

        config.output_directory = Some(PathBuf::from("war"));
        assert_eq!(config.web_output(&project), PathBuf::from("/work/app/war"));
    }

    #[test]
    fn test_java_executable_precedence() {
        let mut config = PipelineConfig::default();
        config.java_home = Some(PathBuf::from("/opt/jdk"));
        assert_eq!(config.java_executable(), default_java(Some(Path::new("/opt/jdk"))));
        config.java = Some(PathBuf::from("/usr/bin/java"));
        assert_eq!(config.java_executable(), PathBuf::from("/usr/bin/java"));
    }

    #[test]
    fn test_display() {
        let output = format!("{}", PipelineConfig::default());
        assert!(output.contains("gwtpipe Configuration:"));
        assert!(output.contains("Style: OBF"));
    }
}
