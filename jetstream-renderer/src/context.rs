//! Documentation context: the serializable payload built from a [`Template`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use jetstream_core::Template;

use crate::error::RenderError;

/// Payload handed to the markdown documentation template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentContext {
    /// `"<ResourceName> FAWS Template"`.
    pub header: String,
    /// A row of `=` as long as `header`.
    pub underline: String,
    pub description: String,
    pub parameters: Vec<ParameterCtx>,
    /// Output names, in template order.
    pub outputs: Vec<String>,
}

/// One template parameter and its declared properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterCtx {
    pub name: String,
    pub properties: Vec<PropertyCtx>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyCtx {
    pub name: String,
    pub value: String,
}

impl DocumentContext {
    /// Build a [`DocumentContext`] from a [`Template`].
    pub fn from_template(template: &Template) -> Self {
        let body = &template.template;
        let header = format!("{} FAWS Template", template.resource_name());
        let underline = "=".repeat(header.chars().count());

        let description = body
            .get("Description")
            .map(display_value)
            .unwrap_or_default();

        let parameters = body
            .get("Parameters")
            .and_then(Value::as_object)
            .map(|params| {
                params
                    .iter()
                    .map(|(name, param)| ParameterCtx {
                        name: name.clone(),
                        properties: param
                            .as_object()
                            .map(|props| {
                                props
                                    .iter()
                                    .map(|(k, v)| PropertyCtx {
                                        name: k.clone(),
                                        value: display_value(v),
                                    })
                                    .collect()
                            })
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let outputs = body
            .get("Outputs")
            .and_then(Value::as_object)
            .map(|outputs| outputs.keys().cloned().collect())
            .unwrap_or_default();

        DocumentContext {
            header,
            underline,
            description,
            parameters,
            outputs,
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

/// Strings render bare, everything else as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_template() -> Template {
        Template::new(
            "s3_bucket.template",
            json!({
                "Description": "Bucket with tags",
                "Parameters": {
                    "AccessControl": {
                        "Type": "String",
                        "Default": "Private",
                        "AllowedValues": ["Private", "PublicRead"]
                    },
                    "Environment": {"Type": "String"}
                },
                "Resources": {},
                "Outputs": {"Arn": {"Value": "x"}, "Name": {"Value": "y"}}
            }),
        )
    }

    #[test]
    fn context_fields_populated() {
        let ctx = DocumentContext::from_template(&make_template());
        assert_eq!(ctx.header, "S3Bucket FAWS Template");
        assert_eq!(ctx.underline.len(), ctx.header.len());
        assert_eq!(ctx.description, "Bucket with tags");
        assert_eq!(ctx.parameters.len(), 2);
        assert_eq!(ctx.parameters[0].name, "AccessControl", "author order preserved");
        assert_eq!(ctx.outputs, vec!["Arn".to_string(), "Name".to_string()]);
    }

    #[test]
    fn non_string_properties_render_as_json() {
        let ctx = DocumentContext::from_template(&make_template());
        let allowed = ctx.parameters[0]
            .properties
            .iter()
            .find(|p| p.name == "AllowedValues")
            .expect("AllowedValues");
        assert_eq!(allowed.value, r#"["Private","PublicRead"]"#);
    }

    #[test]
    fn missing_sections_yield_empty_context() {
        let ctx = DocumentContext::from_template(&Template::new("bare.template", json!({})));
        assert!(ctx.description.is_empty());
        assert!(ctx.parameters.is_empty());
        assert!(ctx.outputs.is_empty());
        ctx.to_tera_context().expect("context conversion");
    }
}
