//! The extension contract and the self-registration entry point exported by
//! plugin libraries.
//!
//! Instead of scanning a loaded unit for capability-implementing types, the
//! host asks the unit to declare them itself: every plugin library exports a
//! [`PluginDeclaration`] under a well-known symbol, and its `register`
//! callback hands one constructor per extension to an
//! [`ExtensionRegistrar`]. The loader then selects the entry matching the
//! candidate's category.
//!
//! Plugin libraries and the host must be built by the same toolchain against
//! the same `nikolite-core`; the declaration carries an ABI revision so a
//! stale artifact is rejected instead of misbehaving.

use std::any::Any;

/// ABI revision of the declaration contract. Bumped whenever
/// [`PluginDeclaration`], [`Extension`], or the registrar signature changes
/// incompatibly.
pub const ABI_VERSION: u32 = 1;

/// Capability contract implemented by every loaded extension object.
///
/// Category-specific consumers reach their concrete interfaces through
/// [`Extension::as_any`]; this subsystem itself never interprets the
/// instance beyond holding it.
pub trait Extension: Send + Sync {
    /// Short human-readable description of what the extension does.
    fn description(&self) -> &str {
        ""
    }

    /// Access to the concrete type for downcasting by consumers.
    fn as_any(&self) -> &dyn Any;
}

/// Constructs an extension instance with no external arguments.
pub type ExtensionConstructor = fn() -> Box<dyn Extension>;

/// Collector handed to a plugin's `register` entry point.
pub trait ExtensionRegistrar {
    /// Register one extension constructor under a category name.
    fn register(&mut self, category: &str, constructor: ExtensionConstructor);
}

/// The value a plugin library exports under [`DECLARATION_SYMBOL`].
#[repr(C)]
pub struct PluginDeclaration {
    pub abi_version: u32,
    pub register: fn(&mut dyn ExtensionRegistrar),
}

/// Exported symbol name, with the trailing NUL used for lookup.
pub(crate) const DECLARATION_SYMBOL: &[u8] = b"PLUGIN_DECLARATION\0";

/// Emits the declaration symbol for a plugin library.
///
/// ```ignore
/// fn register(registrar: &mut dyn ExtensionRegistrar) {
///     registrar.register("PageCompiler", || Box::new(MyCompiler::default()));
/// }
///
/// nikolite_core::export_plugin!(register);
/// ```
#[macro_export]
macro_rules! export_plugin {
    ($register:expr) => {
        #[doc(hidden)]
        #[no_mangle]
        pub static PLUGIN_DECLARATION: $crate::declaration::PluginDeclaration =
            $crate::declaration::PluginDeclaration {
                abi_version: $crate::declaration::ABI_VERSION,
                register: $register,
            };
    };
}
