use assert_fs::prelude::*;
use jetstream_core::Template;
use jetstream_publish::{Destination, PublishGate};
use jetstream_renderer::{GenerateOptions, OutputFormat, Renderer};
use predicates::prelude::*;
use serde_json::json;

fn local_gate(dir: &assert_fs::TempDir, format: OutputFormat) -> PublishGate {
    let destination = Destination::parse(&dir.path().display().to_string()).expect("destination");
    PublishGate::new(destination.open(false).expect("open"), format)
}

#[test]
fn reordered_keys_do_not_republish() {
    let dir = assert_fs::TempDir::new().expect("dir");
    let gate = local_gate(&dir, OutputFormat::Json);

    assert!(gate.publish_file("t.template", r#"{"a": 1, "b": 2}"#).expect("first"));
    assert!(!gate.publish_file("t.template", r#"{"b": 2, "a": 1}"#).expect("second"));

    dir.child("t.template").assert(r#"{"a": 1, "b": 2}"#);
}

#[test]
fn metadata_only_change_does_not_republish() {
    let dir = assert_fs::TempDir::new().expect("dir");
    let gate = local_gate(&dir, OutputFormat::Json);
    let v1 = r#"{"Metadata": {"Jetstream": {"build": "1"}}, "Resources": {"X": {}}}"#;
    let v2 = r#"{"Metadata": {"Jetstream": {"build": "2"}}, "Resources": {"X": {}}}"#;

    assert!(gate.publish_file("t.template", v1).expect("first"));
    assert!(!gate.newer("t.template", v2).expect("newer"));
    assert!(!gate.publish_file("t.template", v2).expect("second"));

    dir.child("t.template").assert(predicate::str::contains(r#""build": "1""#));
}

#[test]
fn new_artifact_always_publishes_and_creates_root() {
    let dir = assert_fs::TempDir::new().expect("dir");
    let root = dir.child("out").child("cfn");
    let destination = Destination::parse(&root.path().display().to_string()).expect("destination");
    let gate = PublishGate::new(destination.open(false).expect("open"), OutputFormat::Json);

    assert!(gate.newer("fresh.template", "{}").expect("newer"));
    assert!(gate.publish_file("fresh.template", "{}").expect("publish"));
    root.child("fresh.template").assert(predicate::path::is_file());
}

#[test]
fn rendered_templates_round_trip_through_the_gate() {
    let dir = assert_fs::TempDir::new().expect("dir");
    let renderer = Renderer::new().expect("renderer");
    let template = Template::new(
        "s3_bucket.template",
        json!({"Resources": {"Bucket": {"Type": "AWS::S3::Bucket"}}, "Description": "b"}),
    );

    for format in [OutputFormat::Json, OutputFormat::Yaml] {
        let gate = local_gate(&dir, format);
        let name = format!("s3_bucket.{}", format.as_str());
        let first = GenerateOptions {
            format,
            additional_metadata: vec![("build".into(), "1".into())],
            ..GenerateOptions::default()
        };
        let second = GenerateOptions {
            additional_metadata: vec![("build".into(), "2".into())],
            ..first.clone()
        };

        let body = renderer.generate(&template, &first).expect("render");
        assert!(gate.publish_file(&name, &body).expect("first publish"));
        let body = renderer.generate(&template, &second).expect("render");
        assert!(!gate.publish_file(&name, &body).expect("second publish"), "{format}");
    }
}

#[test]
fn documentation_is_compared_as_text() {
    let dir = assert_fs::TempDir::new().expect("dir");
    let gate = local_gate(&dir, OutputFormat::Json);

    assert!(gate.publish_text("s3.md", "S3 FAWS Template\n").expect("first"));
    assert!(!gate.publish_text("s3.md", "S3 FAWS Template\n").expect("second"));
    assert!(gate.publish_text("s3.md", "S3 FAWS Template v2\n").expect("third"));
    dir.child("s3.md").assert("S3 FAWS Template v2\n");
}
