//! Fixture plugin whose registration callback declares nothing.

use nikolite_core::{export_plugin, ExtensionRegistrar};

fn register(_registrar: &mut dyn ExtensionRegistrar) {}

export_plugin!(register);
