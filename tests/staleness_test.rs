//! Recompilation decisions driven by file modification times

mod support;

use filetime::{set_file_mtime, FileTime};
use gwtpipe::module::ModuleLoader;
use gwtpipe::project::ProjectModel;
use gwtpipe::StalenessChecker;
use std::fs;
use support::GwtProject;

fn setup() -> (GwtProject, ModuleLoader, StalenessChecker) {
    let project = GwtProject::new();
    let model = ProjectModel::load(project.dir()).unwrap();
    let roots = model.all_source_roots();
    (project, ModuleLoader::new(roots.clone()), StalenessChecker::new(roots))
}

fn write_output(project: &GwtProject) -> std::path::PathBuf {
    let output = project.war().join("app/app.nocache.js");
    fs::create_dir_all(output.parent().unwrap()).unwrap();
    fs::write(&output, "// compiled").unwrap();
    output
}

#[test]
fn test_missing_output_requires_compile() {
    let (project, loader, checker) = setup();
    let module = loader.read("com.example.App").unwrap();
    assert!(checker.is_recompilation_required(&module, &project.war()).unwrap());
}

#[test]
fn test_fresh_output_is_up_to_date() {
    let (project, loader, checker) = setup();
    write_output(&project);
    let module = loader.read("com.example.App").unwrap();
    assert!(!checker.is_recompilation_required(&module, &project.war()).unwrap());
}

#[test]
fn test_touched_source_requires_compile() {
    let (project, loader, checker) = setup();
    let output = write_output(&project);
    set_file_mtime(&output, FileTime::from_unix_time(FileTime::now().unix_seconds() - 60, 0)).unwrap();
    project.write("src/main/java/com/example/client/Widget.java", "class Widget {}");

    let module = loader.read("com.example.App").unwrap();
    assert!(checker.is_recompilation_required(&module, &project.war()).unwrap());
}

#[test]
fn test_untracked_suffix_is_ignored() {
    let (project, loader, checker) = setup();
    let output = write_output(&project);
    set_file_mtime(&output, FileTime::from_unix_time(FileTime::now().unix_seconds() - 60, 0)).unwrap();
    project.write("src/main/java/com/example/client/notes.txt", "scratch");

    let module = loader.read("com.example.App").unwrap();
    assert!(!checker.is_recompilation_required(&module, &project.war()).unwrap());
}

#[test]
fn test_force_overrides_fresh_output() {
    let (project, loader, checker) = setup();
    write_output(&project);
    let module = loader.read("com.example.App").unwrap();
    let forced = checker.with_force(true);
    assert!(forced.is_recompilation_required(&module, &project.war()).unwrap());
}
