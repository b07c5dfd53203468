//! The category registry and legacy-alias normalization.

use std::collections::BTreeSet;

/// Category names older plugins may still declare, mapped to their canonical
/// replacements. Substitution is by exact match during validation, before
/// the category-registry membership check.
pub const LEGACY_CATEGORY_ALIASES: &[(&str, &str)] = &[
    ("Compiler", "PageCompiler"),
    ("Shortcode", "ShortcodePlugin"),
    ("Template", "TemplateSystem"),
];

/// Resolve a possibly-legacy category name to its canonical form.
pub fn canonical_category(name: &str) -> &str {
    LEGACY_CATEGORY_ALIASES
        .iter()
        .find(|(legacy, _)| *legacy == name)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(name)
}

/// The closed set of extension categories the host pipeline understands.
///
/// Fixed before any manifest scan and never mutated afterwards. A manifest
/// declaring a category outside this set is rejected during validation, and
/// the category index always carries one entry per name here, loaded or not.
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    names: BTreeSet<String>,
}

impl CategoryRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// The category set of the stock content-generation pipeline.
    pub fn site_defaults() -> Self {
        Self::new([
            "Command",
            "Task",
            "LateTask",
            "TaskMultiplier",
            "PageCompiler",
            "TemplateSystem",
            "MarkdownExtension",
            "RestExtension",
            "MetadataExtractor",
            "ShortcodePlugin",
            "SignalHandler",
            "ConfigPlugin",
            "CommentSystem",
            "PostScanner",
            "Taxonomy",
        ])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Category names in a stable order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
