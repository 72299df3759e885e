//! Dependency flattening.
//!
//! A template under test pulls in every template whose outputs its test
//! parameters consume, transitively. Each template's `prepare_test` hook runs
//! once, before its dependencies are read, since the hook may add or remove
//! parameter groups.

use std::collections::HashSet;

use jetstream_core::{LifecycleHooks, Package, Template, TemplateName};

use crate::error::TestError;

/// Prepared templates for `roots` and all their dependencies, each once, in
/// depth-first discovery order.
pub fn flatten(
    package: &Package,
    roots: &[TemplateName],
    hooks: &dyn LifecycleHooks,
) -> Result<Vec<Template>, TestError> {
    let mut walk = Walk {
        package,
        hooks,
        done: HashSet::new(),
        path: Vec::new(),
        out: Vec::new(),
    };
    for root in roots {
        walk.visit(root)?;
    }
    tracing::debug!(
        roots = roots.len(),
        flattened = walk.out.len(),
        "flattened test dependencies"
    );
    Ok(walk.out)
}

struct Walk<'a> {
    package: &'a Package,
    hooks: &'a dyn LifecycleHooks,
    done: HashSet<TemplateName>,
    path: Vec<TemplateName>,
    out: Vec<Template>,
}

impl Walk<'_> {
    fn visit(&mut self, name: &TemplateName) -> Result<(), TestError> {
        if let Some(start) = self.path.iter().position(|n| n == name) {
            let chain: Vec<&str> = self.path[start..]
                .iter()
                .chain(std::iter::once(name))
                .map(|n| n.0.as_str())
                .collect();
            return Err(TestError::DependencyCycle(chain.join(" -> ")));
        }
        if self.done.contains(name) {
            return Ok(());
        }

        let mut template = self
            .package
            .get(name)
            .cloned()
            .ok_or_else(|| TestError::UnknownTemplate(name.0.clone()))?;
        self.hooks.prepare_test(&mut template)?;
        let dependencies = template.dependencies();

        self.done.insert(name.clone());
        self.out.push(template);
        self.path.push(name.clone());
        for dependency in &dependencies {
            self.visit(dependency)?;
        }
        self.path.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jetstream_core::{NoopHooks, PackageError, TestParameter, TestParameterGroup};
    use serde_json::json;

    fn template(name: &str, deps: &[&str]) -> Template {
        let mut t = Template::new(name, json!({"Resources": {}}));
        if !deps.is_empty() {
            let mut group = TestParameterGroup::default();
            for dep in deps {
                group.add(TestParameter::from_output(*dep, "Id", *dep, None));
            }
            t.test_parameter_groups.add(group, None);
        }
        t
    }

    fn names(templates: &[Template]) -> Vec<&str> {
        templates.iter().map(|t| t.name.0.as_str()).collect()
    }

    #[test]
    fn diamond_yields_each_template_once() {
        let package = Package::from_templates(
            "/pkg",
            vec![
                template("a", &["b", "c"]),
                template("b", &["d"]),
                template("c", &["d"]),
                template("d", &[]),
            ],
        )
        .unwrap();

        let flat = flatten(&package, &["a".into()], &NoopHooks).unwrap();
        assert_eq!(names(&flat), vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn repeated_roots_are_deduplicated() {
        let package =
            Package::from_templates("/pkg", vec![template("a", &["b"]), template("b", &[])]).unwrap();
        let flat = flatten(&package, &["b".into(), "a".into(), "b".into()], &NoopHooks).unwrap();
        assert_eq!(names(&flat), vec!["b", "a"]);
    }

    #[test]
    fn cycles_are_reported_with_their_path() {
        let package = Package::from_templates(
            "/pkg",
            vec![template("a", &["b"]), template("b", &["c"]), template("c", &["a"])],
        )
        .unwrap();
        let err = flatten(&package, &["a".into()], &NoopHooks).unwrap_err();
        match err {
            TestError::DependencyCycle(chain) => assert_eq!(chain, "a -> b -> c -> a"),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn unknown_root_is_an_error() {
        let package = Package::from_templates("/pkg", vec![template("a", &[])]).unwrap();
        let err = flatten(&package, &["missing".into()], &NoopHooks).unwrap_err();
        assert!(matches!(err, TestError::UnknownTemplate(ref n) if n == "missing"));
    }

    struct AddsDependency;

    impl LifecycleHooks for AddsDependency {
        fn prepare_test(&self, template: &mut Template) -> Result<(), PackageError> {
            if template.name.0 == "a" {
                let mut group = TestParameterGroup::default();
                group.add(TestParameter::from_output("Extra", "Id", "extra", None));
                template.test_parameter_groups.add(group, Some("extra"));
            }
            Ok(())
        }
    }

    #[test]
    fn dependencies_are_read_after_prepare_test() {
        let package =
            Package::from_templates("/pkg", vec![template("a", &[]), template("extra", &[])]).unwrap();
        let flat = flatten(&package, &["a".into()], &AddsDependency).unwrap();
        assert_eq!(names(&flat), vec!["a", "extra"]);
        assert!(flat[0].test_parameter_groups.get("extra").is_some());
    }
}
