#![cfg(test)]

use std::env::consts::DLL_SUFFIX;
use std::fs;
use std::sync::Arc;

use log::Level;
use tempfile::tempdir;

use super::support::{capture, install_fixture, manager_for, write_manifest};

fn manifest_body(name: &str, module: &str, category: &str) -> String {
    format!(
        "[Core]\nname = {name}\nmodule = {module}\n\n[Nikola]\nPluginCategory = {category}\n"
    )
}

#[test]
fn candidate_without_module_is_skipped() {
    let logger = capture();
    let tmp = tempdir().unwrap();
    write_manifest(
        tmp.path(),
        "ghost.plugin",
        &manifest_body("Ghost", "ghost", "PageCompiler"),
    );

    let mut manager = manager_for(tmp.path());
    let candidates = manager.locate_plugins().to_vec();
    assert_eq!(candidates.len(), 1);
    manager.load_plugins(&candidates);
    assert!(manager.plugins().is_empty());
    assert!(logger.has(Level::Warn, "could not be loaded (no valid module detected)"));
}

#[test]
fn corrupt_library_is_skipped() {
    let logger = capture();
    let tmp = tempdir().unwrap();
    write_manifest(
        tmp.path(),
        "junk.plugin",
        &manifest_body("Junk", "junk", "PageCompiler"),
    );
    fs::write(
        tmp.path().join(format!("junk{DLL_SUFFIX}")),
        b"this is not a shared object",
    )
    .unwrap();

    let mut manager = manager_for(tmp.path());
    let candidates = manager.locate_plugins().to_vec();
    manager.load_plugins(&candidates);
    assert!(manager.plugins().is_empty());
    // A library the platform cannot open is a code failure, not a
    // validation rejection.
    assert!(logger.has(Level::Error, "could not be opened"));
}

#[test]
fn end_to_end_manifest_to_loaded_plugin() {
    let logger = capture();
    let tmp = tempdir().unwrap();
    write_manifest(tmp.path(), "x.plugin", &manifest_body("X", "x", "PageCompiler"));
    if !install_fixture("demo_compiler", &tmp.path().join(format!("x{DLL_SUFFIX}"))) {
        return;
    }

    let mut manager = manager_for(tmp.path());
    let candidates = manager.locate_plugins().to_vec();
    assert_eq!(candidates.len(), 1);
    manager.load_plugins(&candidates);

    assert_eq!(manager.plugins().len(), 1);
    let plugin = manager
        .get_plugin_by_name("X", None)
        .expect("plugin X should be loaded");
    assert_eq!(plugin.name, "X");
    assert_eq!(plugin.category, "PageCompiler");
    assert_eq!(plugin.instance.description(), "Compile demo markup into HTML");
    assert_eq!(plugin.module.qualified_name, "x");

    let compilers = manager.get_plugins_of_category("PageCompiler");
    assert_eq!(compilers.len(), 1);
    assert_eq!(compilers[0].name, "X");
    // Category queried by name and filter both resolve the same plugin.
    assert!(manager.get_plugin_by_name("X", Some("PageCompiler")).is_some());
    assert!(manager.get_plugin_by_name("X", Some("Taxonomy")).is_none());

    assert!(logger.has(Level::Debug, &format!("Loaded {}", plugin.plugin_id)));
}

#[test]
fn package_form_module_is_resolved() {
    let tmp = tempdir().unwrap();
    write_manifest(
        tmp.path(),
        "gallery.plugin",
        &manifest_body("Gallery", "gallery", "ShortcodePlugin"),
    );
    let entry = tmp
        .path()
        .join("gallery")
        .join(format!("plugin{DLL_SUFFIX}"));
    if !install_fixture("gallery_shortcode", &entry) {
        return;
    }

    let mut manager = manager_for(tmp.path());
    let candidates = manager.locate_plugins().to_vec();
    manager.load_plugins(&candidates);

    assert_eq!(manager.plugins().len(), 1);
    let plugin = &manager.plugins()[0];
    assert_eq!(plugin.category, "ShortcodePlugin");
    // The conventional entry file does not contribute a name part.
    assert_eq!(plugin.module.qualified_name, "gallery");
}

#[test]
fn module_with_no_matching_extension_is_rejected() {
    let logger = capture();
    let tmp = tempdir().unwrap();
    write_manifest(
        tmp.path(),
        "empty.plugin",
        &manifest_body("Empty", "empty", "PageCompiler"),
    );
    if !install_fixture("no_extensions", &tmp.path().join(format!("empty{DLL_SUFFIX}"))) {
        return;
    }

    let mut manager = manager_for(tmp.path());
    let candidates = manager.locate_plugins().to_vec();
    manager.load_plugins(&candidates);
    assert!(manager.plugins().is_empty());
    assert!(logger.has(
        Level::Warn,
        "does not have any extension for category 'PageCompiler'"
    ));
}

#[test]
fn module_with_several_matching_extensions_is_rejected() {
    let logger = capture();
    let tmp = tempdir().unwrap();
    write_manifest(
        tmp.path(),
        "twins.plugin",
        &manifest_body("Twins", "twins", "PageCompiler"),
    );
    if !install_fixture(
        "double_extensions",
        &tmp.path().join(format!("twins{DLL_SUFFIX}")),
    ) {
        return;
    }

    let mut manager = manager_for(tmp.path());
    let candidates = manager.locate_plugins().to_vec();
    manager.load_plugins(&candidates);
    assert!(manager.plugins().is_empty());
    assert!(logger.has(Level::Warn, "registers 2 extensions for category 'PageCompiler'"));
}

#[test]
fn panicking_module_does_not_abort_the_batch() {
    let logger = capture();
    let tmp = tempdir().unwrap();
    write_manifest(
        &tmp.path().join("bad"),
        "bomb.plugin",
        &manifest_body("Bomb", "bomb", "PageCompiler"),
    );
    write_manifest(
        &tmp.path().join("good"),
        "x.plugin",
        &manifest_body("X", "x", "PageCompiler"),
    );
    let have_bomb = install_fixture(
        "register_panic",
        &tmp.path().join("bad").join(format!("bomb{DLL_SUFFIX}")),
    );
    let have_demo = install_fixture(
        "demo_compiler",
        &tmp.path().join("good").join(format!("x{DLL_SUFFIX}")),
    );
    if !have_bomb || !have_demo {
        return;
    }

    let mut manager = manager_for(tmp.path());
    let candidates = manager.locate_plugins().to_vec();
    assert_eq!(candidates.len(), 2);
    manager.load_plugins(&candidates);

    assert_eq!(manager.plugins().len(), 1);
    assert_eq!(manager.plugins()[0].name, "X");
    assert!(logger.has(Level::Error, "deliberate failure during registration"));
}

#[test]
fn panicking_constructor_is_skipped() {
    let logger = capture();
    let tmp = tempdir().unwrap();
    write_manifest(
        tmp.path(),
        "fragile.plugin",
        &manifest_body("Fragile", "fragile", "PageCompiler"),
    );
    if !install_fixture("ctor_panic", &tmp.path().join(format!("fragile{DLL_SUFFIX}"))) {
        return;
    }

    let mut manager = manager_for(tmp.path());
    let candidates = manager.locate_plugins().to_vec();
    manager.load_plugins(&candidates);
    assert!(manager.plugins().is_empty());
    assert!(logger.has(Level::Error, "deliberate failure while creating an instance"));
}

#[test]
fn abi_mismatched_module_is_rejected() {
    let logger = capture();
    let tmp = tempdir().unwrap();
    write_manifest(
        tmp.path(),
        "stale.plugin",
        &manifest_body("Stale", "stale", "PageCompiler"),
    );
    if !install_fixture("stale_abi", &tmp.path().join(format!("stale{DLL_SUFFIX}"))) {
        return;
    }

    let mut manager = manager_for(tmp.path());
    let candidates = manager.locate_plugins().to_vec();
    manager.load_plugins(&candidates);
    assert!(manager.plugins().is_empty());
    assert!(logger.has(Level::Warn, "ABI revision"));
}

#[test]
fn module_is_executed_once_per_qualified_name() {
    let tmp = tempdir().unwrap();
    // Two candidates naming the same module; the second must reuse the
    // executed unit instead of re-running it.
    write_manifest(tmp.path(), "a.plugin", &manifest_body("A", "x", "PageCompiler"));
    write_manifest(tmp.path(), "b.plugin", &manifest_body("B", "x", "PageCompiler"));
    if !install_fixture("demo_compiler", &tmp.path().join(format!("x{DLL_SUFFIX}"))) {
        return;
    }

    let mut manager = manager_for(tmp.path());
    let candidates = manager.locate_plugins().to_vec();
    assert_eq!(candidates.len(), 2);
    manager.load_plugins(&candidates);

    assert_eq!(manager.plugins().len(), 2);
    assert_eq!(manager.loader.module_count(), 1);
    assert!(Arc::ptr_eq(
        &manager.plugins()[0].module,
        &manager.plugins()[1].module
    ));
}
