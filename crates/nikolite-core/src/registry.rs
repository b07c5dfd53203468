//! The plugin manager: orchestrates scanning, validation, and loading, and
//! serves category and name queries over the loaded set.
//!
//! The manager is strictly single-threaded and synchronous. It is designed
//! to run to completion before any consumer reads it, so it carries no
//! internal locking; a host calling in from several threads must serialize
//! the calls itself (interior mutability below is `RefCell`, which makes
//! that contract explicit in the type).

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::panic::Location;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, error, warn};

use crate::category::CategoryRegistry;
use crate::declaration::Extension;
use crate::loader::{ModuleHandle, ModuleLoader};
use crate::manifest::{self, PluginCandidate};

/// A plugin whose code has executed and whose extension instance is
/// constructed and indexed. Owned by the manager for the life of the
/// process; there is no unload operation.
pub struct PluginInfo {
    pub name: String,
    pub description: Option<String>,
    pub plugin_id: String,
    pub category: String,
    pub compiler: Option<String>,
    pub source_dir: PathBuf,
    pub module_name: String,
    /// The constructed capability instance. Declared before `module` so it
    /// drops while its library is still mapped.
    pub instance: Box<dyn Extension>,
    /// Handle keeping the executed unit alive.
    pub module: ModuleHandle,
}

/// Orchestrates manifest discovery and module loading over a fixed set of
/// plugin roots.
pub struct PluginManager {
    /// Root directories searched for manifests; immutable after
    /// construction.
    plugin_places: Vec<PathBuf>,
    categories: CategoryRegistry,
    /// Replaced wholesale by every scan pass.
    candidates: Vec<PluginCandidate>,
    /// Append-only across load passes. Declared before `loader` so
    /// instances drop before the load table unmaps their libraries.
    pub(crate) plugins: Vec<Arc<PluginInfo>>,
    /// Category name to loaded plugins, rebuilt from scratch on every load
    /// pass over the full known category set.
    pub(crate) plugins_by_category: HashMap<String, Vec<Arc<PluginInfo>>>,
    pub(crate) loader: ModuleLoader,
    /// (alias, caller file, caller line) triples already warned about.
    /// Grows monotonically for the process lifetime.
    deprecation_warned: RefCell<HashSet<(&'static str, &'static str, u32)>>,
}

impl PluginManager {
    /// Create a manager over the given plugin roots.
    ///
    /// `plugins_root` is used only to compute readable qualified names for
    /// loaded units; it does not constrain where plugins may live.
    pub fn new(
        plugin_places: Vec<PathBuf>,
        plugins_root: PathBuf,
        categories: CategoryRegistry,
    ) -> Self {
        Self {
            plugin_places,
            categories,
            candidates: Vec::new(),
            plugins: Vec::new(),
            plugins_by_category: HashMap::new(),
            loader: ModuleLoader::new(plugins_root),
            deprecation_warned: RefCell::new(HashSet::new()),
        }
    }

    pub fn plugin_places(&self) -> &[PathBuf] {
        &self.plugin_places
    }

    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    /// Candidates from the most recent scan pass.
    pub fn candidates(&self) -> &[PluginCandidate] {
        &self.candidates
    }

    /// All loaded plugins, in load order.
    pub fn plugins(&self) -> &[Arc<PluginInfo>] {
        &self.plugins
    }

    /// Scan the configured roots and replace the candidate list with every
    /// manifest that passes validation. Rejections are logged as warnings
    /// and skipped; the pass itself never fails.
    pub fn locate_plugins(&mut self) -> &[PluginCandidate] {
        self.candidates.clear();
        for manifest_path in manifest::find_plugin_manifests(&self.plugin_places) {
            match manifest::parse_manifest(&manifest_path, &self.categories) {
                Ok(candidate) => {
                    debug!("Discovered {}", candidate.plugin_id);
                    self.candidates.push(candidate);
                }
                Err(rejection) => warn!("{rejection}"),
            }
        }
        &self.candidates
    }

    /// Load the given candidates one at a time in order, appending every
    /// successful load to the plugin list, then rebuild the category index.
    /// Callers may pre-filter the candidate list; this is the natural
    /// selection point.
    pub fn load_plugins(&mut self, candidates: &[PluginCandidate]) {
        for candidate in candidates {
            match self.loader.load(candidate) {
                Ok((module, instance)) => {
                    debug!("Loaded {} ({})", candidate.plugin_id, module.path.display());
                    self.plugins.push(Arc::new(PluginInfo {
                        name: candidate.name.clone(),
                        description: candidate.description.clone(),
                        plugin_id: candidate.plugin_id.clone(),
                        category: candidate.category.clone(),
                        compiler: candidate.compiler.clone(),
                        source_dir: candidate.source_dir.clone(),
                        module_name: candidate.module_name.clone(),
                        instance,
                        module,
                    }));
                }
                Err(failure) if failure.is_execution_failure() => error!("{failure}"),
                Err(failure) => warn!("{failure}"),
            }
        }
        self.rebuild_category_index();
    }

    pub(crate) fn rebuild_category_index(&mut self) {
        self.plugins_by_category = self
            .categories
            .names()
            .map(|name| (name.to_string(), Vec::new()))
            .collect();
        for plugin in &self.plugins {
            if let Some(list) = self.plugins_by_category.get_mut(&plugin.category) {
                list.push(Arc::clone(plugin));
            }
        }
    }

    /// Loaded plugins of one category, in load order. An unrecognized
    /// category yields an empty slice, never an error.
    pub fn get_plugins_of_category(&self, category: &str) -> &[Arc<PluginInfo>] {
        self.plugins_by_category
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First loaded plugin with the given name and, if given, category.
    ///
    /// When several plugins share a name, only the first-loaded one is
    /// reachable here; the others remain visible in the category index.
    pub fn get_plugin_by_name(&self, name: &str, category: Option<&str>) -> Option<&Arc<PluginInfo>> {
        self.plugins
            .iter()
            .find(|p| p.name == name && category.map_or(true, |c| p.category == c))
    }

    // Aliases for manager-API compatibility.

    /// Advisory warning for a deprecated alias, emitted at most once per
    /// distinct call site for the life of the process.
    fn warn_deprecation(&self, deprecated_method: &'static str, caller: &'static Location<'static>) {
        let key = (deprecated_method, caller.file(), caller.line());
        if self.deprecation_warned.borrow_mut().insert(key) {
            warn!(
                "Deprecated method {} still called from {}, line {}.",
                deprecated_method,
                caller.file(),
                caller.line()
            );
        }
    }

    /// Deprecated alias of [`PluginManager::get_plugins_of_category`],
    /// functionally identical.
    #[allow(non_snake_case)]
    #[deprecated(note = "use get_plugins_of_category()")]
    #[track_caller]
    pub fn getPluginsOfCategory(&self, category: &str) -> &[Arc<PluginInfo>] {
        self.warn_deprecation("getPluginsOfCategory", Location::caller());
        self.get_plugins_of_category(category)
    }

    /// Deprecated alias of [`PluginManager::get_plugin_by_name`],
    /// functionally identical.
    #[allow(non_snake_case)]
    #[deprecated(note = "use get_plugin_by_name()")]
    #[track_caller]
    pub fn getPluginByName(&self, name: &str, category: Option<&str>) -> Option<&Arc<PluginInfo>> {
        self.warn_deprecation("getPluginByName", Location::caller());
        self.get_plugin_by_name(name, category)
    }
}
