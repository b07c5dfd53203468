//! Manifest scanning, parsing, and validation.
//!
//! Manifests are `.plugin` files in the INI section/key format used by
//! Nikola plugins:
//!
//! ```ini
//! [Core]
//! name = Demo Compiler
//! module = demo_compiler
//!
//! [Documentation]
//! Description = Compile demo markup into HTML
//!
//! [Nikola]
//! PluginCategory = PageCompiler
//! ```
//!
//! Section and key names are matched case-insensitively. Validation turns
//! each manifest into a [`PluginCandidate`] or a [`PluginSystemError`]
//! describing why it was skipped; it never aborts a batch.

use std::fs;
use std::path::{Path, PathBuf};

use configparser::ini::Ini;

use crate::category::{canonical_category, CategoryRegistry};
use crate::error::PluginSystemError;

/// File extension of plugin manifests.
pub const MANIFEST_EXTENSION: &str = "plugin";

/// A manifest that passed structural and category validation but whose code
/// has not been executed yet.
///
/// Candidates from different scan passes are independent values with no
/// shared history; a candidate either becomes a loaded plugin once or is
/// discarded.
#[derive(Debug, Clone)]
pub struct PluginCandidate {
    /// Declared plugin name (`[Core] name`).
    pub name: String,
    /// Optional `[Documentation] Description`.
    pub description: Option<String>,
    /// Diagnostic identifier used in log lines. Identifies a manifest
    /// occurrence only; it need not be globally unique.
    pub plugin_id: String,
    /// Canonical category name, legacy aliases already substituted.
    pub category: String,
    /// Optional `[Nikola] Compiler` value, carried verbatim for
    /// compiler-dispatching categories and never interpreted here.
    pub compiler: Option<String>,
    /// Directory containing the manifest file.
    pub source_dir: PathBuf,
    /// Base name of the code unit, without platform decoration.
    pub module_name: String,
}

/// Recursively collect all manifest files under the given roots.
///
/// Missing or unreadable roots simply yield nothing; ordering across and
/// within roots is unspecified.
pub fn find_plugin_manifests(places: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for place in places {
        scan_directory(place, &mut found);
    }
    found
}

fn scan_directory(dir: &Path, found: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(_) => continue,
        };
        // Symlinks are not followed; a link cycle under a root must not
        // hang the scan.
        if file_type.is_symlink() {
            continue;
        }
        let path = entry.path();
        if file_type.is_dir() {
            scan_directory(&path, found);
        } else if path
            .extension()
            .is_some_and(|ext| ext == MANIFEST_EXTENSION)
        {
            found.push(path);
        }
    }
}

/// Parse one manifest file and validate it against the category registry.
pub fn parse_manifest(
    path: &Path,
    categories: &CategoryRegistry,
) -> Result<PluginCandidate, PluginSystemError> {
    let mut config = Ini::new();
    config
        .load(path)
        .map_err(|message| PluginSystemError::ManifestParse {
            path: path.to_path_buf(),
            message,
        })?;

    let name = require_core_field(&config, path, "name")?;
    let module_name = require_core_field(&config, path, "module")?;
    let plugin_id = format!("Plugin {} from {}", name, path.display());
    let description = config.get("documentation", "description");

    if !config.sections().iter().any(|s| s == "nikola") {
        return Err(PluginSystemError::MissingIntegration { plugin_id });
    }
    let category = match config
        .get("nikola", "plugincategory")
        .filter(|c| !c.is_empty())
    {
        Some(category) => category,
        None => return Err(PluginSystemError::MissingCategory { plugin_id }),
    };
    let compiler = config.get("nikola", "compiler");

    let category = canonical_category(&category).to_string();
    if !categories.contains(&category) {
        return Err(PluginSystemError::UnknownCategory {
            plugin_id,
            category,
        });
    }

    Ok(PluginCandidate {
        name,
        description,
        plugin_id,
        category,
        compiler,
        source_dir: path.parent().unwrap_or_else(|| Path::new("")).to_path_buf(),
        module_name,
    })
}

fn require_core_field(
    config: &Ini,
    path: &Path,
    field: &'static str,
) -> Result<String, PluginSystemError> {
    config
        .get("core", field)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PluginSystemError::MissingCoreField {
            path: path.to_path_buf(),
            field,
        })
}
