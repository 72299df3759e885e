//! Template lifecycle hooks.
//!
//! Hooks run at three points: before a template is rendered
//! (`prepare_generate`), before it is flattened into a validation run
//! (`prepare_test`) and before its documentation is rendered
//! (`prepare_document`). All default to no-ops.

use chrono::{DateTime, Utc};

use crate::error::PackageError;
use crate::types::Template;

pub trait LifecycleHooks {
    fn prepare_generate(&self, _template: &mut Template) -> Result<(), PackageError> {
        Ok(())
    }

    /// May add or remove test parameter groups; callers re-read
    /// dependencies after this returns.
    fn prepare_test(&self, _template: &mut Template) -> Result<(), PackageError> {
        Ok(())
    }

    fn prepare_document(&self, _template: &mut Template) -> Result<(), PackageError> {
        Ok(())
    }
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl LifecycleHooks for NoopHooks {}

/// Stock hooks used by the CLI.
///
/// `prepare_test` expands tera expressions in test parameter values so a
/// definition can ask for per-run values, e.g.
/// `value: "test-bucket-{{ unix_timestamp }}"`. Available variables:
/// `unix_timestamp`, `timestamp` (`%Y%m%d%H%M%S`, UTC) and `template`.
#[derive(Debug, Clone)]
pub struct DefaultHooks {
    now: DateTime<Utc>,
}

impl DefaultHooks {
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Default for DefaultHooks {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleHooks for DefaultHooks {
    fn prepare_test(&self, template: &mut Template) -> Result<(), PackageError> {
        let mut ctx = tera::Context::new();
        ctx.insert("unix_timestamp", &self.now.timestamp());
        ctx.insert("timestamp", &self.now.format("%Y%m%d%H%M%S").to_string());
        ctx.insert("template", &template.name.0);

        for (_, group) in template.test_parameter_groups.iter_mut() {
            for param in group.parameters.iter_mut() {
                if !param.value.contains("{{") {
                    continue;
                }
                param.value = tera::Tera::one_off(&param.value, &ctx, false).map_err(|source| {
                    PackageError::Expand {
                        parameter: param.name.clone(),
                        source,
                    }
                })?;
                tracing::debug!(parameter = %param.name, value = %param.value, "expanded test parameter");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TestParameter, TestParameterGroup};
    use chrono::TimeZone;
    use serde_json::json;

    fn template_with(value: &str) -> Template {
        let mut group = TestParameterGroup::default();
        group.add(TestParameter::new("BucketName", value));
        let mut t = Template::new("s3.template", json!({"Resources": {}}));
        t.test_parameter_groups.add(group, None);
        t
    }

    #[test]
    fn noop_hooks_leave_template_untouched() {
        let mut t = template_with("test-bucket-{{ unix_timestamp }}");
        let before = t.clone();
        NoopHooks.prepare_test(&mut t).expect("prepare_test");
        assert_eq!(t, before);
    }

    #[test]
    fn default_hooks_expand_timestamps() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 8, 7, 6).unwrap();
        let hooks = DefaultHooks::at(now);
        let mut t = template_with("test-bucket-{{ unix_timestamp }}-{{ timestamp }}");
        hooks.prepare_test(&mut t).expect("prepare_test");
        let value = &t.test_parameter_groups.get("default").unwrap().parameters[0].value;
        assert_eq!(value, &format!("test-bucket-{}-20240309080706", now.timestamp()));
    }

    #[test]
    fn default_hooks_leave_plain_values_alone() {
        let mut t = template_with("Private");
        DefaultHooks::new().prepare_test(&mut t).expect("prepare_test");
        assert_eq!(
            t.test_parameter_groups.get("default").unwrap().parameters[0].value,
            "Private"
        );
    }

    #[test]
    fn broken_expression_reports_parameter() {
        let mut t = template_with("{{ unclosed");
        let err = DefaultHooks::new().prepare_test(&mut t).unwrap_err();
        assert!(err.to_string().contains("BucketName"));
    }
}
