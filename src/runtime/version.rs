//! GWT version buckets and the capabilities each one supports.

use serde::Serialize;
use std::fmt;

/// A GWT release line. Ordering follows release order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum VersionTag {
    OneDotFour,
    OneDotFive,
    OneDotSix,
    /// Anything newer than 1.6, and any version string we do not recognise.
    Future,
}

/// What a given GWT release line supports on its command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub compiler_class: &'static str,
    pub shell_class: &'static str,
    pub web_output_argument: &'static str,
    pub supports_multi_module_compile: bool,
    pub supports_parallel_build: bool,
    pub supports_compiler_extras: bool,
    pub platform_classified_dev: bool,
    pub fix_embedded_tomcat_classloader_issue: bool,
}

const LEGACY: Capabilities = Capabilities {
    compiler_class: "com.google.gwt.dev.GWTCompiler",
    shell_class: "com.google.gwt.dev.GWTShell",
    web_output_argument: "-out",
    supports_multi_module_compile: false,
    supports_parallel_build: false,
    supports_compiler_extras: false,
    platform_classified_dev: true,
    fix_embedded_tomcat_classloader_issue: false,
};

const ONE_DOT_SIX: Capabilities = Capabilities {
    compiler_class: "com.google.gwt.dev.Compiler",
    shell_class: "com.google.gwt.dev.HostedMode",
    web_output_argument: "-war",
    supports_multi_module_compile: true,
    supports_parallel_build: true,
    supports_compiler_extras: false,
    platform_classified_dev: true,
    fix_embedded_tomcat_classloader_issue: true,
};

const FUTURE: Capabilities = Capabilities {
    compiler_class: "com.google.gwt.dev.Compiler",
    shell_class: "com.google.gwt.dev.DevMode",
    web_output_argument: "-war",
    supports_multi_module_compile: true,
    supports_parallel_build: true,
    supports_compiler_extras: true,
    platform_classified_dev: false,
    fix_embedded_tomcat_classloader_issue: false,
};

impl VersionTag {
    /// Map a raw version string (`"1.6.4"`, `"2.0.0-rc1"`, ...) to its bucket.
    ///
    /// Unrecognised strings fall into [`VersionTag::Future`]; this never fails.
    pub fn from_version(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("1.4") {
            VersionTag::OneDotFour
        } else if raw.starts_with("1.5") {
            VersionTag::OneDotFive
        } else if raw.starts_with("1.6") {
            VersionTag::OneDotSix
        } else {
            VersionTag::Future
        }
    }

    pub fn capabilities(&self) -> &'static Capabilities {
        match self {
            VersionTag::OneDotFour | VersionTag::OneDotFive => &LEGACY,
            VersionTag::OneDotSix => &ONE_DOT_SIX,
            VersionTag::Future => &FUTURE,
        }
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VersionTag::OneDotFour => "1.4",
            VersionTag::OneDotFive => "1.5",
            VersionTag::OneDotSix => "1.6",
            VersionTag::Future => "2.0+",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        one_four = { "1.4.62", VersionTag::OneDotFour },
        one_five = { "1.5.3", VersionTag::OneDotFive },
        one_six = { "1.6.4", VersionTag::OneDotSix },
        one_six_fake = { "1.6.0-fake", VersionTag::OneDotSix },
        two_zero = { "2.0.0", VersionTag::Future },
        unknown = { "banana", VersionTag::Future },
        empty = { "", VersionTag::Future },
        padded = { "  1.5.0 ", VersionTag::OneDotFive },
    )]
    fn test_from_version(raw: &str, expected: VersionTag) {
        assert_eq!(VersionTag::from_version(raw), expected);
    }

    #[test]
    fn test_fake_one_six_needs_tomcat_fix() {
        let tag = VersionTag::from_version("1.6.0-fake");
        assert!(tag.capabilities().fix_embedded_tomcat_classloader_issue);
    }

    #[test]
    fn test_buckets_are_ordered() {
        assert!(VersionTag::OneDotFour < VersionTag::OneDotFive);
        assert!(VersionTag::OneDotSix < VersionTag::Future);
    }

    #[test]
    fn test_legacy_lines_use_old_entry_points() {
        let caps = VersionTag::OneDotFive.capabilities();
        assert_eq!(caps.compiler_class, "com.google.gwt.dev.GWTCompiler");
        assert_eq!(caps.web_output_argument, "-out");
        assert!(!caps.supports_multi_module_compile);
    }

    #[test]
    fn test_future_drops_platform_classifier() {
        let caps = VersionTag::Future.capabilities();
        assert!(!caps.platform_classified_dev);
        assert!(caps.supports_compiler_extras);
        assert_eq!(caps.shell_class, "com.google.gwt.dev.DevMode");
    }
}
