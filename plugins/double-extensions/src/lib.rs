//! Fixture plugin declaring two extensions for the same category.

use std::any::Any;

use nikolite_core::{export_plugin, Extension, ExtensionRegistrar};

pub struct FirstCompiler;

impl Extension for FirstCompiler {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct SecondCompiler;

impl Extension for SecondCompiler {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn register(registrar: &mut dyn ExtensionRegistrar) {
    registrar.register("PageCompiler", || Box::new(FirstCompiler));
    registrar.register("PageCompiler", || Box::new(SecondCompiler));
}

export_plugin!(register);
