//! Template rendering: [`Renderer`] encodes template bodies as JSON or YAML
//! and renders markdown documentation through [`TemplateEngine`].
//!
//! # Top-level key order
//!
//! Bodies that contain `Resources` are emitted in CloudFormation's
//! conventional order:
//!
//! | Position | Key                        |
//! |----------|----------------------------|
//! | 1        | `AWSTemplateFormatVersion` |
//! | 2        | `Description`              |
//! | 3        | `Metadata`                 |
//! | 4        | `Parameters`               |
//! | 5        | `Conditions`               |
//! | 6        | `Mappings`                 |
//! | 7        | `Resources`                |
//! | 8        | `Outputs`                  |
//!
//! Any other top-level key (e.g. `Transform`) follows in author order.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::{Map, Value};
use tera::Tera;

use jetstream_core::{
    LifecycleHooks, NoopHooks, Template, METADATA_KEY, VOLATILE_METADATA_KEY,
};

use crate::context::DocumentContext;
use crate::error::RenderError;

/// Conventional CloudFormation top-level key order.
pub const TOP_LEVEL_DICT_ORDER: &[&str] = &[
    "AWSTemplateFormatVersion",
    "Description",
    "Metadata",
    "Parameters",
    "Conditions",
    "Mappings",
    "Resources",
    "Outputs",
];

/// Name of the documentation template; a file with this name in the user
/// template directory replaces the embedded one.
pub const DOCUMENT_TEMPLATE: &str = "document.md.tera";

// ---------------------------------------------------------------------------
// Embedded templates, baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[(DOCUMENT_TEMPLATE, include_str!("templates/document.md.tera"))];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io { path: path.into(), source }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut templates = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let name = normalize_template_name(rel);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        tracing::debug!(template = %name, path = %path.display(), "loaded user template override");
        templates.push((name, contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert(normalize_template_name(Path::new(name)), (*content).to_string());
    }
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    let items: Vec<(String, String)> = templates.into_iter().collect();
    tera.add_raw_templates(items)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// OutputFormat
// ---------------------------------------------------------------------------

/// Structured encoding used for rendered templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            other => Err(format!("unknown output format '{other}' (expected json or yaml)")),
        }
    }
}

/// Options for [`Renderer::generate`].
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub format: OutputFormat,
    /// Testing variant: `DeletionPolicy` is removed from every resource.
    pub testing: bool,
    /// Merged into `Metadata.Jetstream`, in order; later keys win.
    pub additional_metadata: Vec<(String, String)>,
}

impl GenerateOptions {
    pub fn testing(format: OutputFormat) -> Self {
        Self {
            format,
            testing: true,
            additional_metadata: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera-based engine for documentation with optional user overrides.
///
/// `user_template_dir` may contain `.tera` files that override embedded defaults.
/// Template names are normalised to lowercase.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Construct a new [`TemplateEngine`], loading embedded templates plus any
    /// overrides found in `user_template_dir`.
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        let tera = build_tera(user_template_dir)?;
        Ok(TemplateEngine { tera })
    }

    /// Render markdown documentation from a prepared context.
    pub fn render_document(&self, ctx: &DocumentContext) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        Ok(self.tera.render(DOCUMENT_TEMPLATE, &tera_ctx)?)
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Renders template bodies and their documentation, running lifecycle hooks
/// on a private copy so the loaded template is never modified.
pub struct Renderer {
    engine: TemplateEngine,
    hooks: Box<dyn LifecycleHooks>,
}

impl Renderer {
    /// Embedded templates, no-op hooks.
    pub fn new() -> Result<Self, RenderError> {
        Self::with_hooks(None, Box::new(NoopHooks))
    }

    pub fn with_hooks(
        user_template_dir: Option<&Path>,
        hooks: Box<dyn LifecycleHooks>,
    ) -> Result<Self, RenderError> {
        Ok(Renderer {
            engine: TemplateEngine::new(user_template_dir)?,
            hooks,
        })
    }

    pub fn hooks(&self) -> &dyn LifecycleHooks {
        self.hooks.as_ref()
    }

    /// Encode `template` as JSON (two-space indent) or YAML.
    pub fn generate(
        &self,
        template: &Template,
        options: &GenerateOptions,
    ) -> Result<String, RenderError> {
        let mut prepared = template.clone();
        self.hooks.prepare_generate(&mut prepared)?;
        prepared.validate()?;

        let name = prepared.name.0.clone();
        let mut body = prepared.template;
        if options.testing {
            strip_deletion_policies(&mut body);
        }
        if !options.additional_metadata.is_empty() {
            merge_metadata(&name, &mut body, &options.additional_metadata)?;
        }
        let body = order_top_level(body);

        let encoded = match options.format {
            OutputFormat::Json => serde_json::to_string_pretty(&body)
                .map_err(|source| RenderError::Json { template: name.clone(), source })?,
            OutputFormat::Yaml => serde_yaml::to_string(&yaml_tree(&name, &body))
                .map_err(|source| RenderError::Yaml { template: name.clone(), source })?,
        };
        tracing::trace!(template = %name, format = %options.format, testing = options.testing, "generated template");
        Ok(encoded)
    }

    /// Render the markdown documentation for `template`.
    pub fn document(&self, template: &Template) -> Result<String, RenderError> {
        let mut prepared = template.clone();
        self.hooks.prepare_document(&mut prepared)?;
        prepared.validate()?;
        self.engine.render_document(&DocumentContext::from_template(&prepared))
    }
}

/// Rebuild `value` as a YAML tree.
///
/// `serde_json` numbers keep their literal text and serialize through a
/// private token that only `serde_json` understands, so numbers are converted
/// explicitly. Integers outside the 64-bit range can only be written as
/// floats in YAML.
fn yaml_tree(template: &str, value: &Value) -> serde_yaml::Value {
    match value {
        Value::Null => serde_yaml::Value::Null,
        Value::Bool(b) => serde_yaml::Value::Bool(*b),
        Value::String(s) => serde_yaml::Value::String(s.clone()),
        Value::Number(n) => {
            let number = if let Some(i) = n.as_i64() {
                serde_yaml::Number::from(i)
            } else if let Some(u) = n.as_u64() {
                serde_yaml::Number::from(u)
            } else {
                let text = n.to_string();
                if !text.contains(['.', 'e', 'E']) {
                    tracing::warn!(template, number = %text, "integer exceeds 64 bits, writing YAML float");
                }
                serde_yaml::Number::from(n.as_f64().unwrap_or(f64::NAN))
            };
            serde_yaml::Value::Number(number)
        }
        Value::Array(items) => {
            serde_yaml::Value::Sequence(items.iter().map(|v| yaml_tree(template, v)).collect())
        }
        Value::Object(map) => serde_yaml::Value::Mapping(
            map.iter()
                .map(|(k, v)| (serde_yaml::Value::String(k.clone()), yaml_tree(template, v)))
                .collect(),
        ),
    }
}

fn strip_deletion_policies(body: &mut Value) {
    let Some(resources) = body.get_mut("Resources").and_then(Value::as_object_mut) else {
        return;
    };
    for resource in resources.values_mut() {
        if let Some(resource) = resource.as_object_mut() {
            resource.shift_remove("DeletionPolicy");
        }
    }
}

fn merge_metadata(
    template: &str,
    body: &mut Value,
    additional: &[(String, String)],
) -> Result<(), RenderError> {
    let invalid = || RenderError::InvalidMetadata { template: template.to_owned() };
    let root = body.as_object_mut().ok_or_else(invalid)?;
    let metadata = root
        .entry(METADATA_KEY)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(invalid)?;
    let volatile = metadata
        .entry(VOLATILE_METADATA_KEY)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(invalid)?;
    for (key, value) in additional {
        volatile.insert(key.clone(), Value::String(value.clone()));
    }
    Ok(())
}

fn order_top_level(body: Value) -> Value {
    let Value::Object(mut map) = body else {
        return body;
    };
    if !map.contains_key("Resources") {
        return Value::Object(map);
    }
    let mut ordered = Map::new();
    for key in TOP_LEVEL_DICT_ORDER {
        if let Some(value) = map.shift_remove(*key) {
            ordered.insert((*key).to_owned(), value);
        }
    }
    ordered.extend(map);
    Value::Object(ordered)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use jetstream_core::PackageError;
    use serde_json::json;

    fn make_template() -> Template {
        Template::new(
            "s3_bucket.template",
            json!({
                "Outputs": {"BucketName": {"Value": {"Ref": "Bucket"}}},
                "Resources": {
                    "Bucket": {"Type": "AWS::S3::Bucket", "DeletionPolicy": "Retain"}
                },
                "Transform": "AWS::Serverless-2016-10-31",
                "Description": "Bucket",
                "AWSTemplateFormatVersion": "2010-09-09"
            }),
        )
    }

    fn keys(rendered: &str) -> Vec<String> {
        let value: Value = serde_json::from_str(rendered).unwrap();
        value.as_object().unwrap().keys().cloned().collect()
    }

    #[test]
    fn renderer_new_succeeds() {
        Renderer::new().expect("Renderer::new should succeed with embedded templates");
    }

    #[test]
    fn top_level_keys_follow_conventional_order() {
        let renderer = Renderer::new().unwrap();
        let out = renderer.generate(&make_template(), &GenerateOptions::default()).unwrap();
        assert_eq!(
            keys(&out),
            vec!["AWSTemplateFormatVersion", "Description", "Resources", "Outputs", "Transform"]
        );
    }

    #[test]
    fn bodies_without_resources_keep_author_order() {
        let renderer = Renderer::new().unwrap();
        let t = Template::new("m.template", json!({"Outputs": {}, "Description": "x"}));
        let out = renderer.generate(&t, &GenerateOptions::default()).unwrap();
        assert_eq!(keys(&out), vec!["Outputs", "Description"]);
    }

    #[test]
    fn json_uses_two_space_indent() {
        let renderer = Renderer::new().unwrap();
        let t = Template::new("m.template", json!({"Resources": {}}));
        let out = renderer.generate(&t, &GenerateOptions::default()).unwrap();
        assert_eq!(out, "{\n  \"Resources\": {}\n}");
    }

    #[test]
    fn testing_mode_strips_deletion_policy_without_touching_source() {
        let renderer = Renderer::new().unwrap();
        let template = make_template();
        let out = renderer
            .generate(&template, &GenerateOptions::testing(OutputFormat::Json))
            .unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert!(value["Resources"]["Bucket"].get("DeletionPolicy").is_none());
        assert_eq!(template.template["Resources"]["Bucket"]["DeletionPolicy"], "Retain");

        let live = renderer.generate(&template, &GenerateOptions::default()).unwrap();
        assert!(live.contains("DeletionPolicy"));
    }

    #[test]
    fn additional_metadata_lands_under_volatile_key() {
        let renderer = Renderer::new().unwrap();
        let options = GenerateOptions {
            additional_metadata: vec![
                ("build".into(), "42".into()),
                ("sha".into(), "abc123".into()),
            ],
            ..GenerateOptions::default()
        };
        let out = renderer.generate(&make_template(), &options).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["Metadata"]["Jetstream"], json!({"build": "42", "sha": "abc123"}));
        assert_eq!(keys(&out)[2], "Metadata");
    }

    #[test]
    fn non_mapping_metadata_is_rejected() {
        let renderer = Renderer::new().unwrap();
        let t = Template::new("m.template", json!({"Metadata": "nope", "Resources": {}}));
        let options = GenerateOptions {
            additional_metadata: vec![("k".into(), "v".into())],
            ..GenerateOptions::default()
        };
        let err = renderer.generate(&t, &options).unwrap_err();
        assert!(matches!(err, RenderError::InvalidMetadata { .. }));
    }

    #[test]
    fn yaml_output_decodes_to_same_tree() {
        let renderer = Renderer::new().unwrap();
        let options = GenerateOptions { format: OutputFormat::Yaml, ..GenerateOptions::default() };
        let yaml = renderer.generate(&make_template(), &options).unwrap();
        let json = renderer.generate(&make_template(), &GenerateOptions::default()).unwrap();
        let from_yaml: Value = serde_yaml::from_str(&yaml).unwrap();
        let from_json: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(from_yaml, from_json);
    }

    #[test]
    fn yaml_numbers_are_plain_scalars() {
        let renderer = Renderer::new().unwrap();
        let template = Template::new(
            "queue.template",
            serde_json::from_str(
                r#"{"Resources": {"Q": {"Type": "AWS::SQS::Queue", "Properties": {"DelaySeconds": 5, "Ratio": 0.25, "Big": 18446744073709551615}}}}"#,
            )
            .unwrap(),
        );
        let options = GenerateOptions { format: OutputFormat::Yaml, ..GenerateOptions::default() };
        let yaml = renderer.generate(&template, &options).unwrap();
        assert!(yaml.contains("DelaySeconds: 5\n"), "{yaml}");
        assert!(yaml.contains("Ratio: 0.25\n"), "{yaml}");
        assert!(yaml.contains("Big: 18446744073709551615\n"), "{yaml}");
        assert!(!yaml.contains("serde_json"), "{yaml}");
    }

    #[test]
    fn output_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("yml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert!("toml".parse::<OutputFormat>().is_err());
    }

    struct Renaming;

    impl LifecycleHooks for Renaming {
        fn prepare_generate(&self, template: &mut Template) -> Result<(), PackageError> {
            template.template["Description"] = json!("from hook");
            Ok(())
        }
    }

    #[test]
    fn prepare_generate_runs_on_a_copy() {
        let renderer = Renderer::with_hooks(None, Box::new(Renaming)).unwrap();
        let template = make_template();
        let out = renderer.generate(&template, &GenerateOptions::default()).unwrap();
        assert!(out.contains("from hook"));
        assert_eq!(template.template["Description"], "Bucket");
    }

    #[test]
    fn no_crlf_in_rendered_documentation() {
        let renderer = Renderer::new().unwrap();
        let doc = renderer.document(&make_template()).unwrap();
        assert!(!doc.contains('\r'));
        assert!(doc.starts_with("S3Bucket FAWS Template\n======================\n"));
    }
}
