//! # Nikolite Core Plugin System
//!
//! Plugin discovery and loading for the Nikolite content-generation
//! pipeline, manifest-compatible with Nikola `.plugin` files. The subsystem
//! turns declarative manifests into categorized, instantiated extension
//! objects:
//!
//! 1. [`PluginManager::locate_plugins`](registry::PluginManager::locate_plugins)
//!    scans the configured roots for `.plugin` manifests, validates each
//!    one against the closed [`CategoryRegistry`](category::CategoryRegistry)
//!    (normalizing legacy category aliases), and keeps the survivors as
//!    [`PluginCandidate`](manifest::PluginCandidate)s.
//! 2. [`PluginManager::load_plugins`](registry::PluginManager::load_plugins)
//!    resolves each candidate's dynamic library, executes it at most once
//!    per qualified name, and instantiates the single extension it declares
//!    for the candidate's category.
//!
//! Every per-item failure is logged with the candidate's diagnostic id and
//! skipped; one bad plugin never prevents the rest from loading.
//!
//! ## Submodules
//!
//! - **[`category`]**: the closed category set and legacy-alias table.
//! - **[`declaration`]**: the [`Extension`](declaration::Extension) contract
//!   and the self-registration entry plugin libraries export.
//! - **[`error`]**: per-item error values ([`PluginSystemError`](error::PluginSystemError)).
//! - **[`manifest`]**: manifest scanning, parsing, and validation.
//! - **[`loader`]**: module resolution, execution, and the first-load-wins
//!   load table.
//! - **[`registry`]**: the [`PluginManager`](registry::PluginManager),
//!   category index, query API, and deprecated-alias shims.

pub mod category;
pub mod declaration;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod registry;

pub use category::{canonical_category, CategoryRegistry, LEGACY_CATEGORY_ALIASES};
pub use declaration::{
    Extension, ExtensionConstructor, ExtensionRegistrar, PluginDeclaration, ABI_VERSION,
};
pub use error::PluginSystemError;
pub use loader::{LoadedModule, ModuleHandle};
pub use manifest::{PluginCandidate, MANIFEST_EXTENSION};
pub use registry::{PluginInfo, PluginManager};

#[cfg(test)]
mod tests;
