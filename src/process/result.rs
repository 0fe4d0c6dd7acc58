use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
    Error,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "SUCCESS"),
            Outcome::Failure => write!(f, "FAILURE"),
            Outcome::Error => write!(f, "ERROR"),
        }
    }
}

/// What a finished child process left behind
#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub last_line: Option<String>,
    pub outcome: Outcome,
}

impl ProcessResult {
    pub fn new(exit_code: Option<i32>, stdout: Vec<String>, stderr: Vec<String>) -> Self {
        let last_line = last_non_empty(&stdout).or_else(|| last_non_empty(&stderr));
        let outcome = classify(last_line.as_deref(), exit_code);
        Self {
            exit_code,
            stdout,
            stderr,
            last_line,
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

fn last_non_empty(lines: &[String]) -> Option<String> {
    lines
        .iter()
        .rev()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

/// `Tests run: N, Failures: F, Errors: E` as printed by the JUnit text runner
pub(crate) fn junit_summary() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Tests run:\s*(\d+),\s*Failures:\s*(\d+),\s*Errors:\s*(\d+)")
            .expect("valid regex")
    })
}

/// Derive an outcome from the last output line, falling back to the exit code.
pub fn classify(last_line: Option<&str>, exit_code: Option<i32>) -> Outcome {
    if let Some(line) = last_line.map(str::trim) {
        if line.starts_with("OK (") {
            return Outcome::Success;
        }
        if let Some(caps) = junit_summary().captures(line) {
            let failures: u64 = caps[2].parse().unwrap_or(0);
            let errors: u64 = caps[3].parse().unwrap_or(0);
            return if errors > 0 {
                Outcome::Error
            } else if failures > 0 {
                Outcome::Failure
            } else {
                Outcome::Success
            };
        }
        if line.contains("FAILURES!!!") {
            return Outcome::Failure;
        }
        if line.starts_with("[ERROR]") || line.contains("Compilation failed") {
            return Outcome::Failure;
        }
        if line.contains("Compilation succeeded") {
            return Outcome::Success;
        }
    }

    match exit_code {
        Some(0) => Outcome::Success,
        Some(_) => Outcome::Failure,
        None => Outcome::Error,
    }
}
