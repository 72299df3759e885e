//! Domain types for Jetstream template packages.
//!
//! A [`Template`] is a named CloudFormation body plus the test parameters used
//! to stand it up during validation. Bodies are opaque `serde_json::Value`
//! trees; nothing here validates CloudFormation resources.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::PackageError;

/// Name of the parameter group used when a template declares none, and the
/// group a sourced parameter reads from when it names none.
pub const DEFAULT_GROUP: &str = "default";

/// Top-level key holding template metadata.
pub const METADATA_KEY: &str = "Metadata";

/// Sub-key of [`METADATA_KEY`] holding render-time values (build ids, dates,
/// hashes) that must never count as a change.
pub const VOLATILE_METADATA_KEY: &str = "Jetstream";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed template name, e.g. `ec2_instance.template`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateName(pub String);

impl TemplateName {
    /// The part of the name before the first `.`.
    pub fn stem(&self) -> &str {
        self.0.split('.').next().unwrap_or_default()
    }

    /// CamelCase identifier used for stack logical ids:
    /// `ec2_instance.template` → `Ec2Instance`.
    pub fn resource_name(&self) -> String {
        self.stem().split('_').map(capitalize).collect()
    }

    /// Markdown documentation file name: `ec2_instance.template` → `ec2_instance.md`.
    pub fn document_name(&self) -> String {
        format!("{}.md", self.stem())
    }
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TemplateName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TemplateName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Uppercase the first character and lowercase the rest.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Test parameters
// ---------------------------------------------------------------------------

/// A single parameter passed to a template's stack during validation.
///
/// When `source` is set, `value` names an output of the source template's
/// test stack and the rendered value becomes a `Fn::GetAtt` on that stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestParameter {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<TemplateName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_group: Option<String>,
}

impl TestParameter {
    /// A literal parameter.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            source: None,
            source_group: None,
        }
    }

    /// A parameter whose value is the output `output` of `source`'s test stack.
    pub fn from_output(
        name: impl Into<String>,
        output: impl Into<String>,
        source: impl Into<TemplateName>,
        source_group: Option<&str>,
    ) -> Self {
        Self {
            name: name.into(),
            value: output.into(),
            source: Some(source.into()),
            source_group: source_group.map(str::to_owned),
        }
    }

    pub fn source_group(&self) -> &str {
        self.source_group.as_deref().unwrap_or(DEFAULT_GROUP)
    }

    /// Value as it appears in the parent template's `Parameters` block.
    pub fn resolved_value(&self) -> Value {
        match &self.source {
            None => Value::String(self.value.clone()),
            Some(source) => json!({
                "Fn::GetAtt": [
                    format!("{}{}", source.resource_name(), capitalize(self.source_group())),
                    format!("Outputs.{}", self.value),
                ]
            }),
        }
    }
}

/// An ordered set of parameters that together produce one test stack.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestParameterGroup {
    pub parameters: Vec<TestParameter>,
}

impl TestParameterGroup {
    pub fn add(&mut self, parameter: TestParameter) {
        self.parameters.push(parameter);
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Parameters as a `{name: value}` mapping, sourced values resolved.
    pub fn to_map(&self) -> Map<String, Value> {
        self.parameters
            .iter()
            .map(|p| (p.name.clone(), p.resolved_value()))
            .collect()
    }

    /// Templates whose outputs this group consumes, deduplicated, in first-seen order.
    pub fn dependencies(&self) -> Vec<TemplateName> {
        let mut deps: Vec<TemplateName> = Vec::new();
        for source in self.parameters.iter().filter_map(|p| p.source.as_ref()) {
            if !deps.contains(source) {
                deps.push(source.clone());
            }
        }
        deps
    }
}

/// Named parameter groups. Each group becomes its own child stack.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestParameterGroups(pub BTreeMap<String, TestParameterGroup>);

impl TestParameterGroups {
    /// Add (or replace) a group; `None` stores it as the default group.
    pub fn add(&mut self, group: TestParameterGroup, name: Option<&str>) {
        self.0
            .insert(name.unwrap_or(DEFAULT_GROUP).to_owned(), group);
    }

    pub fn remove(&mut self, name: &str) -> Result<TestParameterGroup, PackageError> {
        self.0
            .remove(name)
            .ok_or_else(|| PackageError::NoSuchGroup(name.to_owned()))
    }

    pub fn get(&self, name: &str) -> Option<&TestParameterGroup> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TestParameterGroup)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut TestParameterGroup)> {
        self.0.iter_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// A template definition as loaded from a package file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: TemplateName,
    /// The CloudFormation body. Must be a mapping.
    pub template: Value,
    #[serde(default, skip_serializing_if = "TestParameterGroups::is_empty")]
    pub test_parameter_groups: TestParameterGroups,
    /// File the definition was loaded from, if any.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Template {
    pub fn new(name: impl Into<TemplateName>, template: Value) -> Self {
        Self {
            name: name.into(),
            template,
            test_parameter_groups: TestParameterGroups::default(),
            source_path: None,
        }
    }

    pub fn resource_name(&self) -> String {
        self.name.resource_name()
    }

    pub fn document_name(&self) -> String {
        self.name.document_name()
    }

    /// Every template referenced by any parameter group, deduplicated.
    pub fn dependencies(&self) -> Vec<TemplateName> {
        let mut deps: Vec<TemplateName> = Vec::new();
        for (_, group) in self.test_parameter_groups.iter() {
            for dep in group.dependencies() {
                if !deps.contains(&dep) {
                    deps.push(dep);
                }
            }
        }
        deps
    }

    /// Name must be non-empty and the body must be a mapping.
    pub fn validate(&self) -> Result<(), PackageError> {
        if self.name.0.trim().is_empty() {
            return Err(PackageError::MissingAttribute {
                template: self
                    .source_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unnamed>".to_string()),
                attribute: "name",
            });
        }
        if !self.template.is_object() {
            return Err(PackageError::MissingAttribute {
                template: self.name.0.clone(),
                attribute: "template",
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_name_camel_cases_stem() {
        assert_eq!(TemplateName::from("ec2_instance.template").resource_name(), "Ec2Instance");
        assert_eq!(TemplateName::from("s3.template").resource_name(), "S3");
        assert_eq!(TemplateName::from("VPC_BASE.json").resource_name(), "VpcBase");
    }

    #[test]
    fn document_name_uses_stem() {
        assert_eq!(TemplateName::from("ec2.template").document_name(), "ec2.md");
        assert_eq!(TemplateName::from("plain").document_name(), "plain.md");
    }

    #[test]
    fn literal_parameter_resolves_to_string() {
        let p = TestParameter::new("Environment", "Integration");
        assert_eq!(p.resolved_value(), json!("Integration"));
    }

    #[test]
    fn sourced_parameter_resolves_to_get_att() {
        let p = TestParameter::from_output("VpcId", "VpcId", "network_base.template", Some("private"));
        assert_eq!(
            p.resolved_value(),
            json!({"Fn::GetAtt": ["NetworkBasePrivate", "Outputs.VpcId"]})
        );

        let default_group = TestParameter::from_output("VpcId", "VpcId", "vpc.template", None);
        assert_eq!(
            default_group.resolved_value(),
            json!({"Fn::GetAtt": ["VpcDefault", "Outputs.VpcId"]})
        );
    }

    #[test]
    fn group_dependencies_are_deduplicated() {
        let mut group = TestParameterGroup::default();
        group.add(TestParameter::from_output("A", "A", "vpc.template", None));
        group.add(TestParameter::from_output("B", "B", "vpc.template", None));
        group.add(TestParameter::new("C", "c"));
        assert_eq!(group.dependencies(), vec![TemplateName::from("vpc.template")]);
        assert_eq!(group.to_map().len(), 3);
    }

    #[test]
    fn groups_add_defaults_name_and_remove_unknown_errors() {
        let mut groups = TestParameterGroups::default();
        groups.add(TestParameterGroup::default(), None);
        assert!(groups.get(DEFAULT_GROUP).is_some());

        let err = groups.remove("missing").unwrap_err();
        assert!(matches!(err, PackageError::NoSuchGroup(ref g) if g == "missing"));
        groups.remove(DEFAULT_GROUP).expect("remove default");
        assert!(groups.is_empty());
    }

    #[test]
    fn validate_rejects_non_mapping_body() {
        let t = Template::new("bad.template", json!(["not", "a", "mapping"]));
        let err = t.validate().unwrap_err();
        assert!(err.to_string().contains("template"));
    }

    #[test]
    fn template_deserializes_without_groups() {
        let yaml = "name: s3.template\ntemplate:\n  Resources: {}\n";
        let t: Template = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(t.name, TemplateName::from("s3.template"));
        assert!(t.test_parameter_groups.is_empty());
        assert!(t.dependencies().is_empty());
    }
}
