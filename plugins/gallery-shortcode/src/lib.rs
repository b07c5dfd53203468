//! Fixture plugin declaring exactly one ShortcodePlugin extension.

use std::any::Any;

use nikolite_core::{export_plugin, Extension, ExtensionRegistrar};

#[derive(Default)]
pub struct GalleryShortcode;

impl Extension for GalleryShortcode {
    fn description(&self) -> &str {
        "Render image galleries from a shortcode"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn register(registrar: &mut dyn ExtensionRegistrar) {
    registrar.register("ShortcodePlugin", || Box::new(GalleryShortcode));
}

export_plugin!(register);
