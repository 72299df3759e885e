//! Serde roundtrip tests for template definitions.

use jetstream_core::{Template, TestParameter, TestParameterGroup, TestParameterGroups};
use rstest::rstest;
use serde_json::json;

fn minimal_template() -> Template {
    Template::new("minimal.template", json!({"Resources": {}}))
}

fn grouped_template() -> Template {
    let mut private = TestParameterGroup::default();
    private.add(TestParameter::new("AccessControl", "Private"));
    private.add(TestParameter::from_output("VpcId", "VpcId", "vpc.template", Some("private")));

    let mut public = TestParameterGroup::default();
    public.add(TestParameter::new("AccessControl", "PublicRead"));

    let mut groups = TestParameterGroups::default();
    groups.add(private, Some("private"));
    groups.add(public, Some("public"));

    let mut t = Template::new(
        "s3_bucket.template",
        json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Description": "Bucket",
            "Resources": {"Bucket": {"Type": "AWS::S3::Bucket", "DeletionPolicy": "Retain"}},
            "Outputs": {"Arn": {"Value": {"Fn::GetAtt": ["Bucket", "Arn"]}}}
        }),
    );
    t.test_parameter_groups = groups;
    t
}

fn unicode_template() -> Template {
    Template::new("ünïcode.template", json!({"Description": "描述 - ok", "Resources": {}}))
}

// ---------------------------------------------------------------------------
// Parameterised roundtrip test
// ---------------------------------------------------------------------------

#[rstest]
#[case("minimal", minimal_template())]
#[case("grouped", grouped_template())]
#[case("unicode_strings", unicode_template())]
fn template_roundtrip(#[case] label: &str, #[case] template: Template) {
    let yaml = serde_yaml::to_string(&template)
        .unwrap_or_else(|e| panic!("[{label}] serialize failed: {e}"));
    let back: Template = serde_yaml::from_str(&yaml)
        .unwrap_or_else(|e| panic!("[{label}] deserialize failed: {e}"));
    assert_eq!(template.name, back.name, "[{label}] name");
    assert_eq!(template.template, back.template, "[{label}] body");
    assert_eq!(
        template.test_parameter_groups, back.test_parameter_groups,
        "[{label}] groups"
    );
}

#[rstest]
#[case(None, "default")]
#[case(Some("private"), "private")]
fn group_naming(#[case] name: Option<&str>, #[case] expected: &str) {
    let mut groups = TestParameterGroups::default();
    groups.add(TestParameterGroup::default(), name);
    assert!(groups.get(expected).is_some());
}
