//! Manifest scanning: which sibling repositories does each child depend on?
//!
//! Each managed repository carries its own Cargo.toml. The `[package].name`
//! is the module path siblings reference; the dependency-table keys (with
//! `package =` renames honored) are its requirements. Only requirements that
//! resolve to another managed repository become graph edges - everything else
//! is an external dependency and stays out of release ordering.

use crate::core::error::{ConvoyError, ConvoyResult, ResultExt};
use std::fs;
use std::path::{Path, PathBuf};

const DEP_TABLES: [&str; 3] = ["dependencies", "dev-dependencies", "build-dependencies"];

/// One managed repository as discovered from the product root
#[derive(Debug, Clone)]
pub struct RepoInfo {
  /// Unique name, the submodule path relative to the product root
  pub name: String,
  /// Identity other repositories use to depend on this one
  pub module_path: String,
  /// Absolute working-tree location
  pub directory: PathBuf,
  /// Raw requirement strings from the manifest, own module path excluded
  pub requirements: Vec<String>,
}

/// Read a child repository's manifest
///
/// Returns None when the directory has no Cargo.toml (the repository is not
/// under release management).
pub fn read_repo(root: &Path, submodule_path: &str) -> ConvoyResult<Option<RepoInfo>> {
  let directory = root.join(submodule_path);
  let manifest_path = directory.join("Cargo.toml");
  if !manifest_path.exists() {
    return Ok(None);
  }

  let content = fs::read_to_string(&manifest_path)
    .with_context(|| format!("Failed to read manifest {}", manifest_path.display()))?;
  let doc: toml_edit::DocumentMut = content
    .parse()
    .map_err(|e: toml_edit::TomlError| ConvoyError::message(format!("{}: {}", manifest_path.display(), e)))?;

  let module_path = match package_name(&doc) {
    Some(name) => name,
    None => return Ok(None), // virtual workspace manifest, not a releasable unit
  };

  let mut requirements = Vec::new();
  for table in DEP_TABLES {
    if let Some(deps) = doc.get(table).and_then(|t| t.as_table_like()) {
      for (key, value) in deps.iter() {
        // `foo = { package = "bar", ... }` depends on bar, not foo
        let required = value
          .as_table_like()
          .and_then(|t| t.get("package"))
          .and_then(|p| p.as_str())
          .unwrap_or(key);
        let required = required.to_string();
        if required != module_path && !requirements.contains(&required) {
          requirements.push(required);
        }
      }
    }
  }

  Ok(Some(RepoInfo {
    name: submodule_path.to_string(),
    module_path,
    directory,
    requirements,
  }))
}

fn package_name(doc: &toml_edit::DocumentMut) -> Option<String> {
  doc
    .get("package")
    .and_then(|p| p.as_table_like())
    .and_then(|p| p.get("name"))
    .and_then(|n| n.as_str())
    .map(|s| s.to_string())
}
