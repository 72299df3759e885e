//! Package loading error-message and layout integration tests.

use assert_fs::prelude::*;
use jetstream_core::{load_at, package, PackageError, TemplateName};
use predicates::prelude::predicate;

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn corrupt_yaml_returns_parse_error_with_path() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("ec2.yaml")
        .write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = load_at(root.path()).unwrap_err();
    assert!(matches!(err, PackageError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("ec2.yaml"), "must contain file path, got: {err}");
}

#[test]
fn corrupt_json_returns_json_error_with_path() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("vpc.json").write_str("{\"name\": ").expect("write");

    let err = load_at(root.path()).unwrap_err();
    assert!(matches!(err, PackageError::Json { .. }), "got: {err}");
    assert!(err.to_string().contains("vpc.json"));
}

#[test]
fn body_that_is_not_a_mapping_is_rejected() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("list.yaml")
        .write_str("name: list.template\ntemplate:\n  - a\n  - b\n")
        .expect("write");

    let err = load_at(root.path()).unwrap_err();
    assert!(matches!(err, PackageError::MissingAttribute { attribute: "template", .. }), "got: {err}");
}

#[test]
fn non_string_test_parameter_value_is_rejected() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("s3.yaml")
        .write_str(
            "name: s3.template\ntemplate: {}\ntest_parameter_groups:\n  default:\n    - name: Count\n      value: [1, 2]\n",
        )
        .expect("write");

    let err = load_at(root.path()).unwrap_err();
    assert!(matches!(err, PackageError::Parse { .. }), "got: {err}");
}

#[test]
fn index_pointing_at_missing_file_reports_io_path() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child(package::PACKAGE_INDEX)
        .write_str("templates:\n  - ghost.yaml\n")
        .expect("write");

    let err = load_at(root.path()).unwrap_err();
    assert!(matches!(err, PackageError::Io { .. }), "got: {err}");
    assert!(err.to_string().contains("ghost.yaml"));
}

// ---------------------------------------------------------------------------
// 2. Dependencies across files
// ---------------------------------------------------------------------------

#[test]
fn cross_file_dependencies_resolve() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("vpc.yaml")
        .write_str("name: vpc.template\ntemplate:\n  Outputs:\n    VpcId: {Value: x}\n")
        .expect("write");
    root.child("ec2.yaml")
        .write_str(
            "name: ec2.template\n\
             template: {}\n\
             test_parameter_groups:\n\
             \x20 default:\n\
             \x20   - name: VpcId\n\
             \x20     value: VpcId\n\
             \x20     source: vpc.template\n",
        )
        .expect("write");

    let pkg = load_at(root.path()).expect("load");
    let ec2 = pkg.get(&TemplateName::from("ec2.template")).expect("ec2");
    assert_eq!(ec2.dependencies(), vec![TemplateName::from("vpc.template")]);
    root.child("ec2.yaml").assert(predicate::path::exists());
}

#[test]
fn empty_directory_loads_empty_package() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let pkg = load_at(root.path()).expect("load");
    assert!(pkg.is_empty());
}
