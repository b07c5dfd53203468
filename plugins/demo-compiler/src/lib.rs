//! Fixture plugin declaring exactly one PageCompiler extension.

use std::any::Any;

use nikolite_core::{export_plugin, Extension, ExtensionRegistrar};

#[derive(Default)]
pub struct DemoCompiler;

impl Extension for DemoCompiler {
    fn description(&self) -> &str {
        "Compile demo markup into HTML"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn register(registrar: &mut dyn ExtensionRegistrar) {
    registrar.register("PageCompiler", || Box::new(DemoCompiler));
}

export_plugin!(register);
