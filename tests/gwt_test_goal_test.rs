//! Test goal against a fake JUnit runner

#![cfg(unix)]

mod support;

use gwtpipe::config::PipelineConfig;
use gwtpipe::goals::test::run_tests;
use gwtpipe::goals::GoalContext;
use gwtpipe::process::Outcome;
use gwtpipe::PipelineError;
use std::fs;
use support::GwtProject;

fn context(project: &GwtProject) -> GoalContext {
    let config = PipelineConfig::load(project.dir()).expect("Failed to load config");
    GoalContext::prepare(config, project.dir()).expect("Failed to prepare context")
}

fn with_tests(project: &GwtProject) {
    project.write(
        "src/test/java/com/example/client/GwtTestApp.java",
        "package com.example.client;\npublic class GwtTestApp {}\n",
    );
    project.write(
        "src/test/java/com/example/client/AppTest.java",
        "package com.example.client;\npublic class AppTest {}\n",
    );
}

#[test]
fn test_passing_tests_write_reports() {
    let project = GwtProject::new();
    with_tests(&project);
    project.configure(
        r#"for a in "$@"; do echo "$a"; done
echo ""
echo "OK (2 tests)"
"#,
        "",
    );

    let report = run_tests(&context(&project)).unwrap();
    assert_eq!(report.results.len(), 1);
    let result = &report.results[0];
    assert_eq!(result.class_name, "com.example.client.GwtTestApp");
    assert_eq!(result.outcome, Outcome::Success);
    assert_eq!(result.tests_run, 2);
    assert!(report.verify(false).is_ok());

    let text = fs::read_to_string(&result.report).unwrap();
    assert!(result.report.ends_with("TEST-com.example.client.GwtTestApp.txt"));
    assert!(text.contains("Testsuite: com.example.client.GwtTestApp"));
    assert!(text.contains("junit.textui.TestRunner"));
    assert!(text.contains("-Dgwt.args=-war"));
    assert!(text.contains("Tests run: 2, Failures: 0, Errors: 0"));
}

#[test]
fn test_failing_tests_fail_verification() {
    let project = GwtProject::new();
    with_tests(&project);
    project.configure(
        "echo 'FAILURES!!!'\necho 'Tests run: 3,  Failures: 1,  Errors: 0'\nexit 1\n",
        "",
    );

    let report = run_tests(&context(&project)).unwrap();
    assert_eq!(report.results[0].outcome, Outcome::Failure);
    assert_eq!(report.results[0].failures, 1);
    match report.verify(false) {
        Err(PipelineError::TestFailures { failures, errors }) => {
            assert_eq!(failures, 1);
            assert_eq!(errors, 0);
        }
        other => panic!("Expected TestFailures, got {:?}", other),
    }
    assert!(report.verify(true).is_ok());
}

#[test]
fn test_skip_tests_launches_nothing() {
    let project = GwtProject::new();
    with_tests(&project);
    let marker = project.path("launched");
    project.configure(&format!("touch '{}'\n", marker.display()), "skip-tests = true\n");

    let report = run_tests(&context(&project)).unwrap();
    assert!(report.skipped);
    assert!(report.results.is_empty());
    assert!(!marker.exists());
}
