//! Fixture plugin whose extension constructor panics.

use nikolite_core::{export_plugin, Extension, ExtensionRegistrar};

fn register(registrar: &mut dyn ExtensionRegistrar) {
    registrar.register("PageCompiler", || -> Box<dyn Extension> {
        panic!("deliberate failure while creating an instance");
    });
}

export_plugin!(register);
