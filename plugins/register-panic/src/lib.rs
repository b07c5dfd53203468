//! Fixture plugin whose registration callback panics.

use nikolite_core::{export_plugin, ExtensionRegistrar};

fn register(_registrar: &mut dyn ExtensionRegistrar) {
    panic!("deliberate failure during registration");
}

export_plugin!(register);
