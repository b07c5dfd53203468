//! Dynamic module resolution and execution.
//!
//! A candidate's `module` names a dynamic library next to its manifest,
//! either as a single file or as a package directory with a conventional
//! entry file. Executing a unit means `dlopen`ing it and running its
//! registration callback; the code runs with full host privilege in this
//! process, and any side effect it performs is permanent whether or not the
//! candidate ends up loading.
//!
//! Units are executed at most once per qualified name: the loader keeps an
//! append-only load table and later candidates resolving to the same name
//! reuse the executed unit instead of re-running it.

use std::collections::HashMap;
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;

use crate::declaration::{
    Extension, ExtensionConstructor, ExtensionRegistrar, PluginDeclaration, ABI_VERSION,
    DECLARATION_SYMBOL,
};
use crate::error::PluginSystemError;
use crate::manifest::PluginCandidate;

/// Entry-file stem looked for inside package-form modules.
const PACKAGE_ENTRY_STEM: &str = "plugin";

/// One constructor registered by an executed unit.
#[derive(Clone)]
pub(crate) struct RegisteredExtension {
    pub(crate) category: String,
    pub(crate) constructor: ExtensionConstructor,
}

/// An executed plugin code unit: the live library and everything it
/// registered. Shared between the load table and every plugin created from
/// the unit; dropped only when both let go, which for this subsystem means
/// never before process exit.
pub struct LoadedModule {
    /// Dot-joined name relative to the project root; human-readable and the
    /// load-table key.
    pub qualified_name: String,
    /// Resolved code location.
    pub path: PathBuf,
    pub(crate) extensions: Vec<RegisteredExtension>,
    /// Kept alive so the registered constructors and any instances built
    /// from them stay valid. `None` only in test stubs.
    library: Option<Library>,
}

impl LoadedModule {
    #[cfg(test)]
    pub(crate) fn stub(qualified_name: &str) -> ModuleHandle {
        Arc::new(LoadedModule {
            qualified_name: qualified_name.to_string(),
            path: PathBuf::new(),
            extensions: Vec::new(),
            library: None,
        })
    }
}

/// Shared handle to an executed unit. Cloning never re-executes the unit.
pub type ModuleHandle = Arc<LoadedModule>;

struct CollectingRegistrar {
    extensions: Vec<RegisteredExtension>,
}

impl ExtensionRegistrar for CollectingRegistrar {
    fn register(&mut self, category: &str, constructor: ExtensionConstructor) {
        self.extensions.push(RegisteredExtension {
            category: category.to_string(),
            constructor,
        });
    }
}

/// Resolves candidate code locations and executes them, at most once per
/// qualified name.
pub struct ModuleLoader {
    /// Project root used only to derive readable qualified names.
    plugins_root: PathBuf,
    /// Append-only load table. The first load of a qualified name wins;
    /// later candidates reuse the executed unit, so its side effects run
    /// once.
    modules: HashMap<String, ModuleHandle>,
}

impl ModuleLoader {
    pub fn new(plugins_root: PathBuf) -> Self {
        Self {
            plugins_root,
            modules: HashMap::new(),
        }
    }

    /// Number of distinct units executed so far.
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Execute the candidate's code unit (or reuse a previously executed
    /// one) and construct its extension instance for the candidate's
    /// category.
    pub fn load(
        &mut self,
        candidate: &PluginCandidate,
    ) -> Result<(ModuleHandle, Box<dyn Extension>), PluginSystemError> {
        let code_path = self.resolve_module_path(candidate).ok_or_else(|| {
            PluginSystemError::ModuleNotFound {
                plugin_id: candidate.plugin_id.clone(),
            }
        })?;
        // Load-phase diagnostics also name the resolved code location.
        let plugin_id = format!("{} ({})", candidate.plugin_id, code_path.display());
        let qualified_name = self.qualified_name(candidate, &code_path);

        let module = match self.modules.get(&qualified_name) {
            Some(existing) => Arc::clone(existing),
            None => {
                let module = Arc::new(execute_module(&plugin_id, qualified_name.clone(), code_path)?);
                self.modules.insert(qualified_name, Arc::clone(&module));
                module
            }
        };

        let matching: Vec<&RegisteredExtension> = module
            .extensions
            .iter()
            .filter(|e| e.category == candidate.category)
            .collect();
        let constructor = match matching.as_slice() {
            [] => {
                return Err(PluginSystemError::NoExtension {
                    plugin_id,
                    category: candidate.category.clone(),
                })
            }
            [single] => single.constructor,
            several => {
                return Err(PluginSystemError::AmbiguousExtension {
                    plugin_id,
                    category: candidate.category.clone(),
                    count: several.len(),
                })
            }
        };

        let instance = panic::catch_unwind(constructor).map_err(|payload| {
            PluginSystemError::ConstructionPanic {
                plugin_id,
                message: panic_message(&payload),
            }
        })?;
        Ok((module, instance))
    }

    /// Resolve the candidate's code location: a single library named after
    /// the module, else a package directory holding the conventional entry
    /// file. Platform-decorated file names (`lib` prefix) are accepted so
    /// artifacts can be dropped in as built.
    fn resolve_module_path(&self, candidate: &PluginCandidate) -> Option<PathBuf> {
        let module = &candidate.module_name;
        let direct = [
            format!("{module}{DLL_SUFFIX}"),
            format!("{DLL_PREFIX}{module}{DLL_SUFFIX}"),
        ];
        for name in &direct {
            let path = candidate.source_dir.join(name);
            if path.is_file() {
                return Some(path);
            }
        }
        let entry = [
            format!("{PACKAGE_ENTRY_STEM}{DLL_SUFFIX}"),
            format!("{DLL_PREFIX}{PACKAGE_ENTRY_STEM}{DLL_SUFFIX}"),
        ];
        for name in &entry {
            let path = candidate.source_dir.join(module).join(name);
            if path.is_file() {
                return Some(path);
            }
        }
        None
    }

    /// Dot-joined unit name relative to the project root. Falls back to the
    /// bare module name when the code lives outside the root.
    fn qualified_name(&self, candidate: &PluginCandidate, code_path: &Path) -> String {
        let relative = match code_path.strip_prefix(&self.plugins_root) {
            Ok(relative) => relative,
            Err(_) => return candidate.module_name.clone(),
        };
        let mut parts: Vec<String> = relative
            .iter()
            .map(|part| part.to_string_lossy().into_owned())
            .collect();
        if let Some(file) = parts.pop() {
            let mut stem = file.strip_suffix(DLL_SUFFIX).unwrap_or(&file).to_string();
            if !DLL_PREFIX.is_empty() {
                if let Some(bare) = stem.strip_prefix(DLL_PREFIX) {
                    if bare == candidate.module_name || bare == PACKAGE_ENTRY_STEM {
                        stem = bare.to_string();
                    }
                }
            }
            // The entry file of a package does not contribute a name part.
            if stem != PACKAGE_ENTRY_STEM {
                parts.push(stem);
            }
        }
        parts.join(".")
    }
}

/// `dlopen` the unit and run its registration callback once.
fn execute_module(
    plugin_id: &str,
    qualified_name: String,
    path: PathBuf,
) -> Result<LoadedModule, PluginSystemError> {
    // Library constructors run here, unsandboxed. There is no way to
    // attribute or undo their side effects if anything below fails.
    let library =
        unsafe { Library::new(&path) }.map_err(|source| PluginSystemError::LibraryOpen {
            plugin_id: plugin_id.to_string(),
            path: path.clone(),
            source,
        })?;

    let extensions = {
        let declaration = unsafe { library.get::<*const PluginDeclaration>(DECLARATION_SYMBOL) }
            .map_err(|source| PluginSystemError::MissingDeclaration {
                plugin_id: plugin_id.to_string(),
                source,
            })?;
        let declaration: &PluginDeclaration = unsafe { &**declaration };
        if declaration.abi_version != ABI_VERSION {
            return Err(PluginSystemError::AbiMismatch {
                plugin_id: plugin_id.to_string(),
                found: declaration.abi_version,
                expected: ABI_VERSION,
            });
        }

        let mut registrar = CollectingRegistrar {
            extensions: Vec::new(),
        };
        panic::catch_unwind(AssertUnwindSafe(|| {
            (declaration.register)(&mut registrar)
        }))
        .map_err(|payload| PluginSystemError::RegistrationPanic {
            plugin_id: plugin_id.to_string(),
            message: panic_message(&payload),
        })?;
        registrar.extensions
    };

    Ok(LoadedModule {
        qualified_name,
        path,
        extensions,
        library: Some(library),
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    eprintln!(
        "DIAG: payload type_id={:?} str={:?} String={:?}",
        payload.type_id(),
        std::any::TypeId::of::<&'static str>(),
        std::any::TypeId::of::<String>()
    );
    if let Some(inner) = payload.downcast_ref::<Box<dyn std::any::Any + Send>>() {
        eprintln!(
            "DIAG: inner type_id={:?} inner_str={:?} inner_String={:?}",
            (**inner).type_id(),
            inner.downcast_ref::<&'static str>(),
            inner.downcast_ref::<String>()
        );
    }
    unsafe {
        #[repr(C)]
        struct DlInfo {
            fname: *const std::os::raw::c_char,
            fbase: *mut std::ffi::c_void,
            sname: *const std::os::raw::c_char,
            saddr: *mut std::ffi::c_void,
        }
        extern "C" {
            fn dladdr(addr: *const std::ffi::c_void, info: *mut DlInfo) -> i32;
        }
        let (data, vtable): (*const u8, *const u8) = std::mem::transmute(payload);
        let mut info = std::mem::zeroed::<DlInfo>();
        if dladdr(vtable as *const _, &mut info) != 0 && !info.fname.is_null() {
            eprintln!(
                "DIAG: outer vtable in {:?}",
                std::ffi::CStr::from_ptr(info.fname)
            );
        }
        let words: &[usize; 2] = &*(data as *const [usize; 2]);
        eprintln!("DIAG: payload words: {:#x} {:#x}", words[0], words[1]);
        if words[1] > 0 && words[1] < 256 {
            let s = std::slice::from_raw_parts(words[0] as *const u8, words[1]);
            eprintln!("DIAG: as &str: {:?}", String::from_utf8_lossy(s));
        }
    }
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
