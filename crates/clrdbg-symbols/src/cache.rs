//! Parsed-symbol cache keyed by `(sidecar path, mtime)`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use rustc_hash::FxHashMap;

use crate::error::SymbolError;
use crate::pdb::SymbolFile;

/// Shared cache of parsed sidecars. A stale mtime invalidates the entry.
/// Parsing is single-flighted per assembly: the slot mutex is held for the
/// duration of one parse, so concurrent requesters of the same assembly
/// coalesce while other assemblies proceed unblocked.
#[derive(Debug, Default)]
pub struct SymbolCache {
    slots: Mutex<FxHashMap<PathBuf, Arc<Slot>>>,
}

#[derive(Debug, Default)]
struct Slot {
    state: Mutex<Option<Loaded>>,
}

#[derive(Debug)]
struct Loaded {
    mtime: SystemTime,
    file: Arc<SymbolFile>,
}

impl SymbolCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load (or re-use) the symbols for `assembly`. The sidecar lives next
    /// to the assembly with a `.pdb` suffix; there is no search path.
    pub fn load(&self, assembly: &Path) -> Result<Arc<SymbolFile>, SymbolError> {
        let sidecar = sidecar_path(assembly);
        let mtime = std::fs::metadata(&sidecar)
            .and_then(|meta| meta.modified())
            .map_err(|source| SymbolError::Io {
                path: sidecar.clone(),
                source,
            })?;

        let slot = {
            let mut slots = self.slots.lock().expect("symbol cache poisoned");
            Arc::clone(slots.entry(sidecar.clone()).or_default())
        };

        let mut state = slot.state.lock().expect("symbol slot poisoned");
        if let Some(loaded) = state.as_ref() {
            if loaded.mtime == mtime {
                return Ok(Arc::clone(&loaded.file));
            }
        }

        let data = std::fs::read(&sidecar).map_err(|source| SymbolError::Io {
            path: sidecar.clone(),
            source,
        })?;
        let file = Arc::new(SymbolFile::parse(&data)?);
        *state = Some(Loaded {
            mtime,
            file: Arc::clone(&file),
        });
        tracing::debug!(sidecar = %sidecar.display(), methods = file.methods.len(), "symbols_parsed");
        Ok(file)
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.slots.lock().expect("symbol cache poisoned").clear();
    }
}

fn sidecar_path(assembly: &Path) -> PathBuf {
    let mut path = assembly.to_path_buf();
    path.set_extension("pdb");
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdb::PdbBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

    fn temp_assembly(label: &str) -> PathBuf {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let mut dir = std::env::temp_dir();
        dir.push(format!("clrdbg-symbols-{label}-{id}"));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("App.dll")
    }

    #[test]
    fn missing_sidecar_is_not_found() {
        let cache = SymbolCache::new();
        let err = cache.load(Path::new("/nonexistent/App.dll")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn caches_until_mtime_changes() {
        let assembly = temp_assembly("mtime");
        let sidecar = sidecar_path(&assembly);
        std::fs::write(&sidecar, PdbBuilder::new().document("A.cs").build()).unwrap();

        let cache = SymbolCache::new();
        let first = cache.load(&assembly).unwrap();
        let second = cache.load(&assembly).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        // Rewrite with a different document and an explicit older mtime so
        // the change is observable regardless of filesystem granularity.
        std::fs::write(&sidecar, PdbBuilder::new().document("B.cs").build()).unwrap();
        let stale = std::time::SystemTime::now() - std::time::Duration::from_secs(120);
        let file = std::fs::File::options().write(true).open(&sidecar).unwrap();
        file.set_modified(stale).unwrap();

        let third = cache.load(&assembly).unwrap();
        assert_eq!(third.documents[0].name, "B.cs");
    }
}
