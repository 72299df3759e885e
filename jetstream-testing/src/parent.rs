//! The parent ("master") template that nests one stack per test parameter
//! group of every flattened template.

use serde_json::{json, Map, Value};

use jetstream_core::types::capitalize;
use jetstream_core::{Template, DEFAULT_GROUP};

use crate::names::StagingNames;

pub const STACK_RESOURCE_TYPE: &str = "AWS::CloudFormation::Stack";

/// `{"Resources": {...}}` with an `AWS::CloudFormation::Stack` per child.
///
/// Logical ids are `resource_name + Capitalised(group)`; templates without
/// parameter groups get a single `<ResourceName>Default` stack.
pub fn parent_template(templates: &[Template], names: &StagingNames) -> Value {
    let mut resources = Map::new();
    for template in templates {
        let template_url = names.template_url(&template.name.0);

        if template.test_parameter_groups.is_empty() {
            resources.insert(
                format!("{}{}", template.resource_name(), capitalize(DEFAULT_GROUP)),
                stack_resource(&template_url, Map::new()),
            );
            continue;
        }

        for (group_name, group) in template.test_parameter_groups.iter() {
            resources.insert(
                format!("{}{}", template.resource_name(), capitalize(group_name)),
                stack_resource(&template_url, group.to_map()),
            );
        }
    }
    json!({ "Resources": resources })
}

fn stack_resource(template_url: &str, parameters: Map<String, Value>) -> Value {
    let mut properties = Map::new();
    properties.insert("TemplateURL".to_owned(), Value::String(template_url.to_owned()));
    if !parameters.is_empty() {
        properties.insert("Parameters".to_owned(), Value::Object(parameters));
    }
    json!({
        "Type": STACK_RESOURCE_TYPE,
        "Properties": properties,
    })
}
