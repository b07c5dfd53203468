//! Fixture plugin declaring an ABI revision the host does not speak.

use nikolite_core::declaration::PluginDeclaration;
use nikolite_core::{ExtensionRegistrar, ABI_VERSION};

fn register(_registrar: &mut dyn ExtensionRegistrar) {}

#[no_mangle]
pub static PLUGIN_DECLARATION: PluginDeclaration = PluginDeclaration {
    abi_version: ABI_VERSION + 1,
    register,
};
