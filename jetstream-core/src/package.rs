//! Template package loading.
//!
//! # Layout
//!
//! ```text
//! <root>/
//!   package.yaml          (optional index: `templates: [a.yaml, b.yaml]`)
//!   ec2_instance.yaml     (one template definition per file)
//!   s3_bucket.json
//! ```
//!
//! Without an index every `*.yaml`, `*.yml` and `*.json` file in `root`
//! (except `package.yaml`) is loaded, sorted by file name. The root is always
//! an explicit argument; nothing here consults the working directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{io_err, PackageError};
use crate::types::{Template, TemplateName};

/// File name of the optional package index.
pub const PACKAGE_INDEX: &str = "package.yaml";

#[derive(Debug, Deserialize)]
struct PackageIndex {
    #[serde(default)]
    templates: Vec<PathBuf>,
}

/// A loaded set of templates, in load order.
#[derive(Debug, Clone)]
pub struct Package {
    pub root: PathBuf,
    templates: Vec<Template>,
}

impl Package {
    /// Build a package from already-constructed templates.
    ///
    /// Applies the same duplicate and dependency checks as [`load_at`].
    pub fn from_templates(
        root: impl Into<PathBuf>,
        templates: Vec<Template>,
    ) -> Result<Self, PackageError> {
        let root = root.into();
        let mut seen = HashSet::new();
        for template in &templates {
            template.validate()?;
            if !seen.insert(template.name.clone()) {
                return Err(PackageError::DuplicateTemplate {
                    name: template.name.0.clone(),
                    path: template.source_path.clone().unwrap_or_else(|| root.clone()),
                });
            }
        }
        for template in &templates {
            for dep in template.dependencies() {
                if !seen.contains(&dep) {
                    return Err(PackageError::UnknownDependency {
                        template: template.name.0.clone(),
                        dependency: dep.0,
                    });
                }
            }
        }
        Ok(Self { root, templates })
    }

    pub fn get(&self, name: &TemplateName) -> Option<&Template> {
        self.templates.iter().find(|t| &t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    pub fn names(&self) -> Vec<TemplateName> {
        self.templates.iter().map(|t| t.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Load every template definition under `root`.
///
/// Returns `PackageError::PackageNotFound` if `root` is not a directory.
pub fn load_at(root: &Path) -> Result<Package, PackageError> {
    if !root.is_dir() {
        return Err(PackageError::PackageNotFound {
            path: root.to_path_buf(),
        });
    }

    let files = definition_files(root)?;
    let mut templates = Vec::with_capacity(files.len());
    for path in files {
        templates.push(load_template_at(&path)?);
    }
    tracing::debug!(root = %root.display(), count = templates.len(), "loaded template package");
    Package::from_templates(root, templates)
}

/// Load a single template definition file (YAML, or JSON by extension).
pub fn load_template_at(path: &Path) -> Result<Template, PackageError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let mut template: Template = if has_extension(path, &["json"]) {
        serde_json::from_str(&contents).map_err(|source| PackageError::Json {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        serde_yaml::from_str(&contents).map_err(|source| PackageError::Parse {
            path: path.to_path_buf(),
            source,
        })?
    };
    template.source_path = Some(path.to_path_buf());
    template.validate()?;
    Ok(template)
}

fn definition_files(root: &Path) -> Result<Vec<PathBuf>, PackageError> {
    let index_path = root.join(PACKAGE_INDEX);
    if index_path.exists() {
        let contents = std::fs::read_to_string(&index_path).map_err(|e| io_err(&index_path, e))?;
        let index: PackageIndex = serde_yaml::from_str(&contents).map_err(|source| {
            PackageError::Parse {
                path: index_path.clone(),
                source,
            }
        })?;
        return Ok(index.templates.into_iter().map(|p| root.join(p)).collect());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(root)
        .map_err(|e| io_err(root, e))?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| has_extension(p, &["yaml", "yml", "json"]))
        .collect();
    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}
