//! Image catalog built for each LIST command.
//!
//! Maps the display name the device sees (a file's base name) to the path the
//! host reads from. Order is walk discovery order; a later file with the same
//! display name replaces the earlier path but keeps the earlier position.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::events::{DbiEvent, DbiObserver, LogLevel};
use crate::protocol::constants::SUPPORTED_EXTENSIONS;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Cannot walk library root {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// One installable image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub display_name: String,
    pub resolved_path: PathBuf,
}

/// Ordered display-name → path mapping.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk `root` recursively and collect every `.nsp`, `.nsz` and `.xci` file.
    ///
    /// Within a directory, files are visited before subdirectories and each
    /// group is sorted by name. Unreadable entries below the root are skipped
    /// with a warning; failing to read the root itself is an error.
    pub fn build<O: DbiObserver + ?Sized>(root: &Path, observer: &O) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();

        let walker = WalkDir::new(root).follow_links(false).sort_by(|a, b| {
            a.file_type()
                .is_dir()
                .cmp(&b.file_type().is_dir())
                .then_with(|| a.file_name().cmp(b.file_name()))
        });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(CatalogError::Walk {
                        path: root.to_path_buf(),
                        source: e,
                    });
                }
                Err(e) => {
                    observer.on_event(&DbiEvent::Log {
                        level: LogLevel::Warn,
                        message: format!("Skipping unreadable entry: {}", e),
                    });
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                observer.on_event(&DbiEvent::Log {
                    level: LogLevel::Debug,
                    message: format!("Found directory: {}", entry.path().display()),
                });
                continue;
            }

            // Symlinked files are listed like regular ones; symlinked dirs are not followed.
            let is_file = file_type.is_file() || (file_type.is_symlink() && entry.path().is_file());
            if !is_file || !is_supported_image(entry.path()) {
                continue;
            }

            let display_name = entry.file_name().to_string_lossy().into_owned();
            observer.on_event(&DbiEvent::Log {
                level: LogLevel::Debug,
                message: format!("\t{}", display_name),
            });
            catalog.insert(display_name, entry.into_path());
        }

        Ok(catalog)
    }

    /// Insert or overwrite an entry. Overwriting keeps the original position.
    pub fn insert(&mut self, display_name: impl Into<String>, resolved_path: impl Into<PathBuf>) {
        let display_name = display_name.into();
        let resolved_path = resolved_path.into();
        match self.index.get(&display_name) {
            Some(&i) => self.entries[i].resolved_path = resolved_path,
            None => {
                self.index.insert(display_name.clone(), self.entries.len());
                self.entries.push(CatalogEntry {
                    display_name,
                    resolved_path,
                });
            }
        }
    }

    pub fn get(&self, display_name: &str) -> Option<&Path> {
        self.index
            .get(display_name)
            .map(|&i| self.entries[i].resolved_path.as_path())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.display_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// LIST response payload: every display name followed by `\n`.
    pub fn to_list_payload(&self) -> Vec<u8> {
        let mut payload = String::new();
        for name in self.names() {
            payload.push_str(name);
            payload.push('\n');
        }
        payload.into_bytes()
    }
}

/// Resolve a requested name: a catalog hit gives the mapped path, anything
/// else is used as a path verbatim.
pub fn resolve_name(catalog: Option<&Catalog>, name: &str) -> PathBuf {
    catalog
        .filter(|c| !c.is_empty())
        .and_then(|c| c.get(name))
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(name))
}

/// Whether `path` has one of the served image extensions (any case).
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullObserver;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_build_filters_extensions_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for name in [
            "a.nsp",
            "B.NSZ",
            "c.Xci",
            "readme.txt",
            "d.nsp.part",
            "nsp",
            "sub/e.xci",
            "sub/f.zip",
        ] {
            touch(&root.join(name));
        }

        let catalog = Catalog::build(root, &NullObserver).unwrap();
        let names: Vec<_> = catalog.names().collect();
        assert_eq!(names, ["B.NSZ", "a.nsp", "c.Xci", "e.xci"]);
        assert_eq!(catalog.get("e.xci").unwrap(), root.join("sub").join("e.xci"));
    }

    #[test]
    fn test_walk_order_files_before_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("a/z.nsp"));
        touch(&root.join("b.nsp"));
        touch(&root.join("a/deeper/y.nsp"));
        touch(&root.join("c/x.nsp"));

        let catalog = Catalog::build(root, &NullObserver).unwrap();
        let names: Vec<_> = catalog.names().collect();
        assert_eq!(names, ["b.nsp", "z.nsp", "y.nsp", "x.nsp"]);
    }

    #[test]
    fn test_duplicate_names_keep_position_and_take_last_path() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("game.nsp"));
        touch(&root.join("other.xci"));
        touch(&root.join("mirror/game.nsp"));

        let catalog = Catalog::build(root, &NullObserver).unwrap();
        let names: Vec<_> = catalog.names().collect();
        assert_eq!(names, ["game.nsp", "other.xci"]);
        assert_eq!(
            catalog.get("game.nsp").unwrap(),
            root.join("mirror").join("game.nsp")
        );
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Catalog::build(&dir.path().join("nope"), &NullObserver);
        assert!(matches!(result, Err(CatalogError::Walk { .. })));
    }

    #[test]
    fn test_list_payload() {
        let mut catalog = Catalog::new();
        assert!(catalog.to_list_payload().is_empty());

        catalog.insert("a.nsp", "/lib/a.nsp");
        catalog.insert("Pokémon.xci", "/lib/p.xci");
        let payload = catalog.to_list_payload();
        assert_eq!(payload, "a.nsp\nPokémon.xci\n".as_bytes());
        assert_eq!(payload.len(), 6 + "Pokémon.xci".len() + 1);
    }

    #[test]
    fn test_resolve_name() {
        let mut catalog = Catalog::new();
        catalog.insert("game.nsp", "/lib/game.nsp");

        assert_eq!(
            resolve_name(Some(&catalog), "game.nsp"),
            PathBuf::from("/lib/game.nsp")
        );
        assert_eq!(
            resolve_name(Some(&catalog), "missing.nsp"),
            PathBuf::from("missing.nsp")
        );
        assert_eq!(resolve_name(None, "game.nsp"), PathBuf::from("game.nsp"));
        assert_eq!(
            resolve_name(Some(&Catalog::new()), "game.nsp"),
            PathBuf::from("game.nsp")
        );
    }
}
