#![cfg(test)]
//! Shared helpers: a capturing logger and lookup of fixture plugin
//! artifacts built by the workspace.

use std::env;
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::category::CategoryRegistry;
use crate::registry::PluginManager;

/// Collects every emitted log record. Installed once per process; tests
/// run in parallel, so assertions must filter by needles unique to the
/// test (tempdir paths, method names, line numbers).
#[derive(Default)]
pub struct CaptureLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl CaptureLogger {
    pub fn count_containing(&self, needle: &str) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, message)| message.contains(needle))
            .count()
    }

    pub fn has(&self, level: Level, needle: &str) -> bool {
        let records = self.records.lock().unwrap();
        let found = records
            .iter()
            .any(|(l, message)| *l == level && message.contains(needle));
        if !found {
            eprintln!("DIAG: needle {needle:?} at {level:?} not found; records:");
            for (l, m) in records.iter() {
                eprintln!("DIAG:   [{l:?}] {m}");
            }
        }
        found
    }
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.records
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

/// Install (idempotently) and return the process-wide capture logger.
pub fn capture() -> &'static CaptureLogger {
    static LOGGER: OnceLock<CaptureLogger> = OnceLock::new();
    let logger = LOGGER.get_or_init(CaptureLogger::default);
    let _ = log::set_logger(logger);
    log::set_max_level(LevelFilter::Debug);
    logger
}

/// A manager rooted at `root` with the stock category set.
pub fn manager_for(root: &Path) -> PluginManager {
    PluginManager::new(
        vec![root.to_path_buf()],
        root.to_path_buf(),
        CategoryRegistry::site_defaults(),
    )
}

pub fn write_manifest(dir: &Path, file_name: &str, body: &str) -> PathBuf {
    fs::create_dir_all(dir).expect("failed to create manifest directory");
    let path = dir.join(file_name);
    fs::write(&path, body).expect("failed to write manifest");
    path
}

/// Platform-decorated artifact name for a fixture library stem.
pub fn fixture_artifact(stem: &str) -> String {
    format!("{DLL_PREFIX}{stem}{DLL_SUFFIX}")
}

/// Locate a fixture cdylib built by the workspace, or `None` when the
/// artifact has not been built (the caller should then skip its test).
pub fn built_fixture(stem: &str) -> Option<PathBuf> {
    let artifact = fixture_artifact(stem);
    let mut roots = Vec::new();
    if let Ok(dir) = env::var("CARGO_TARGET_DIR") {
        roots.push(PathBuf::from(dir));
    }
    roots.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target"));
    roots.push(PathBuf::from("target"));
    for root in roots {
        for profile in ["debug", "release"] {
            let path = root.join(profile).join(&artifact);
            if path.exists() {
                return Some(path);
            }
        }
    }
    None
}

/// Copy a built fixture into place as `dest`, creating parent directories.
/// Returns false (after printing a skip notice) when the fixture is not
/// built.
pub fn install_fixture(stem: &str, dest: &Path) -> bool {
    let Some(source) = built_fixture(stem) else {
        println!(
            "Skipping: fixture library '{}' not built; run a workspace build first.",
            stem
        );
        return false;
    };
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).expect("failed to create module directory");
    }
    fs::copy(&source, dest).expect("failed to copy fixture library");
    true
}
