//! Error types for manifest validation and module loading.
//!
//! Every variant describes a recoverable, per-item condition: the offending
//! manifest or candidate is logged with its diagnostic id and skipped, and
//! the enclosing batch always continues. No fatal-error class exists at this
//! layer.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("failed to read plugin manifest {}: {message}", path.display())]
    ManifestParse { path: PathBuf, message: String },

    #[error("manifest {} does not declare Core.{field} - it will not be loaded", path.display())]
    MissingCoreField { path: PathBuf, field: &'static str },

    #[error("{plugin_id} does not specify Nikola configuration - it will not be loaded")]
    MissingIntegration { plugin_id: String },

    #[error("{plugin_id} does not specify any category - it will not be loaded")]
    MissingCategory { plugin_id: String },

    #[error("{plugin_id} specifies invalid category '{category}'")]
    UnknownCategory { plugin_id: String, category: String },

    #[error("{plugin_id} could not be loaded (no valid module detected)")]
    ModuleNotFound { plugin_id: String },

    #[error("{plugin_id} could not be opened: {source}")]
    LibraryOpen {
        plugin_id: String,
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("{plugin_id} does not export a plugin declaration: {source}")]
    MissingDeclaration {
        plugin_id: String,
        #[source]
        source: libloading::Error,
    },

    #[error("{plugin_id} was built against ABI revision {found}, host expects {expected}")]
    AbiMismatch {
        plugin_id: String,
        found: u32,
        expected: u32,
    },

    #[error("{plugin_id} threw an exception while loading: {message}")]
    RegistrationPanic { plugin_id: String, message: String },

    #[error("{plugin_id} does not have any extension for category '{category}'")]
    NoExtension { plugin_id: String, category: String },

    #[error("{plugin_id} registers {count} extensions for category '{category}'; this is not supported - skipping")]
    AmbiguousExtension {
        plugin_id: String,
        category: String,
        count: usize,
    },

    #[error("{plugin_id} threw an exception while creating an instance: {message}")]
    ConstructionPanic { plugin_id: String, message: String },
}

impl PluginSystemError {
    /// Failures raised by loading or executing plugin code rather than by
    /// validating it. These carry the underlying cause and are logged at
    /// error severity.
    pub fn is_execution_failure(&self) -> bool {
        matches!(
            self,
            Self::LibraryOpen { .. }
                | Self::RegistrationPanic { .. }
                | Self::ConstructionPanic { .. }
        )
    }
}
