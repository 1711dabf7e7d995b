//! In-memory cache of one symbol library file and its `.dcm` documentation.
//!
//! Parts live in a [`SlotMap`]; the alias table maps every alias name to the
//! slot of the part that owns it. A part disappears with its last alias.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

use slotmap::{new_key_type, SlotMap};

use crate::emit::{format_doc, format_library, write_file};
use crate::error::{Error, LoadWarning, Result};
use crate::model::{LibAlias, LibPart};
use crate::parser::{load_doc_file, load_library_file, LibVersion};

new_key_type! {
    pub struct PartKey;
}

/// Modification generation shared by a set of caches.
///
/// Every mutation of a cache holding this handle bumps the counter, so
/// anything derived from library contents can tell when it went stale.
#[derive(Debug, Clone, Default)]
pub struct Epoch(Rc<Cell<u64>>);

impl Epoch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u64 {
        self.0.get()
    }

    fn bump(&self) {
        self.0.set(self.0.get() + 1);
    }
}

#[derive(Debug, Clone)]
pub struct LibraryCacheOptions {
    /// Read the `.dcm` file next to libraries old enough to have one
    pub load_doc: bool,
    /// Write the `.dcm` file on save
    pub save_doc: bool,
}

impl Default for LibraryCacheOptions {
    fn default() -> Self {
        Self {
            load_doc: true,
            save_doc: true,
        }
    }
}

#[derive(Debug)]
pub struct LibraryCache {
    path: PathBuf,
    options: LibraryCacheOptions,
    epoch: Epoch,
    version: LibVersion,
    parts: SlotMap<PartKey, LibPart>,
    aliases: BTreeMap<String, PartKey>,
    modified: bool,
    /// File modification time as of the last load or save
    mtime: Option<SystemTime>,
    warnings: Vec<LoadWarning>,
}

impl LibraryCache {
    /// An empty cache for a library that will be written to `path`.
    pub fn new(path: impl Into<PathBuf>, options: LibraryCacheOptions, epoch: Epoch) -> Self {
        Self {
            path: path.into(),
            options,
            epoch,
            version: LibVersion::CURRENT,
            parts: SlotMap::with_key(),
            aliases: BTreeMap::new(),
            modified: false,
            mtime: None,
            warnings: Vec::new(),
        }
    }

    /// Load the library at `path`.
    pub fn load(
        path: impl Into<PathBuf>,
        options: LibraryCacheOptions,
        epoch: Epoch,
    ) -> Result<Self> {
        let mut cache = Self::new(path, options, epoch);
        cache.reload()?;
        Ok(cache)
    }

    /// Discard the cached contents and read the file again.
    pub fn reload(&mut self) -> Result<()> {
        log::debug!("loading library cache {}", self.path.display());
        let file = load_library_file(&self.path)?;

        self.parts.clear();
        self.aliases.clear();
        self.warnings.clear();
        self.version = file.version;
        for part in file.parts {
            self.insert_renaming(part);
        }

        if self.options.load_doc && self.version.has_doc_sidecar() {
            self.load_doc();
        }

        self.modified = false;
        self.mtime = modified_time(&self.path);
        self.epoch.bump();
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Documentation file belonging to this library
    pub fn doc_path(&self) -> PathBuf {
        self.path.with_extension("dcm")
    }

    pub fn version(&self) -> LibVersion {
        self.version
    }

    pub fn epoch(&self) -> &Epoch {
        &self.epoch
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Recoverable problems found by the last load
    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    /// Whether the file on disk was touched since the last load or save.
    pub fn is_file_changed(&self) -> bool {
        modified_time(&self.path) != self.mtime
    }

    /// Reload if the file changed on disk. Returns whether it reloaded.
    pub fn ensure_fresh(&mut self) -> Result<bool> {
        if !self.is_file_changed() {
            return Ok(false);
        }
        self.reload()?;
        Ok(true)
    }

    /// Alias names in sorted order
    pub fn alias_names(&self) -> impl Iterator<Item = &str> {
        self.aliases.keys().map(String::as_str)
    }

    /// Each part once, sorted by part name.
    pub fn parts(&self) -> impl Iterator<Item = &LibPart> {
        self.aliases
            .iter()
            .filter_map(|(name, key)| self.parts.get(*key).filter(|p| p.name == *name))
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// The part owning alias `name`.
    pub fn part(&self, name: &str) -> Option<&LibPart> {
        self.parts.get(*self.aliases.get(name)?)
    }

    /// The part owning alias `name` together with the alias itself.
    pub fn lookup(&self, name: &str) -> Option<(&LibPart, &LibAlias)> {
        let part = self.part(name)?;
        Some((part, part.alias(name)?))
    }

    /// Add `part`, first removing any alias it would shadow.
    pub fn add_symbol(&mut self, part: LibPart) {
        for alias in &part.aliases {
            if self.aliases.contains_key(&alias.name) {
                self.remove_alias(&alias.name);
            }
        }
        let names: Vec<String> = part.aliases.iter().map(|a| a.name.clone()).collect();
        let key = self.parts.insert(part);
        for name in names {
            self.aliases.insert(name, key);
        }
        self.touch();
    }

    /// Remove alias `name`. The part goes with its last alias; removing the
    /// root alias promotes the next remaining one.
    pub fn delete_alias(&mut self, name: &str) -> Option<LibAlias> {
        let removed = self.remove_alias(name)?;
        self.touch();
        Some(removed)
    }

    /// Remove the part owning alias `name`, with all of its aliases.
    pub fn delete_symbol(&mut self, name: &str) -> Option<LibPart> {
        let key = *self.aliases.get(name)?;
        let part = self.parts.remove(key)?;
        for alias in &part.aliases {
            self.aliases.remove(&alias.name);
        }
        self.touch();
        Some(part)
    }

    /// Write the library, and its documentation if enabled. Does nothing
    /// when the cache is unmodified.
    pub fn save(&mut self) -> Result<()> {
        if !self.modified {
            return Ok(());
        }

        write_file(&self.path, &format_library(self.parts()))?;
        if self.options.save_doc {
            let aliases = self.aliases.iter().filter_map(|(name, key)| {
                self.parts.get(*key).and_then(|part| part.alias(name))
            });
            write_file(&self.doc_path(), &format_doc(aliases))?;
        }

        self.version = LibVersion::CURRENT;
        self.modified = false;
        self.mtime = modified_time(&self.path);
        Ok(())
    }

    fn touch(&mut self) {
        self.modified = true;
        self.epoch.bump();
    }

    fn remove_alias(&mut self, name: &str) -> Option<LibAlias> {
        let key = self.aliases.remove(name)?;
        let part = self.parts.get_mut(key)?;
        let index = part.aliases.iter().position(|a| a.name == name)?;
        let removed = part.aliases.remove(index);

        if part.aliases.is_empty() {
            self.parts.remove(key);
        } else if index == 0 {
            let root = part.aliases[0].name.clone();
            part.set_name(root);
        }
        Some(removed)
    }

    /// Register a freshly loaded part, renaming aliases that are taken.
    fn insert_renaming(&mut self, mut part: LibPart) {
        for i in 0..part.aliases.len() {
            let original = part.aliases[i].name.clone();
            let taken = |name: &str, part: &LibPart| {
                self.aliases.contains_key(name)
                    || part
                        .aliases
                        .iter()
                        .enumerate()
                        .any(|(j, a)| j != i && a.name == name)
            };
            if !taken(&original, &part) {
                continue;
            }

            let renamed = (1..)
                .map(|n| format!("{original}_{n}"))
                .find(|name| !taken(name, &part))
                .unwrap_or_default();
            let warning = LoadWarning::AliasNameCollision {
                library: self.path.display().to_string(),
                original,
                renamed: renamed.clone(),
            };
            log::warn!("{warning}");
            self.warnings.push(warning);

            if i == 0 {
                part.set_name(renamed);
            } else {
                part.aliases[i].name = renamed;
            }
        }

        let names: Vec<String> = part.aliases.iter().map(|a| a.name.clone()).collect();
        let key = self.parts.insert(part);
        for name in names {
            self.aliases.insert(name, key);
        }
    }

    fn load_doc(&mut self) {
        let doc_path = self.doc_path();
        if !doc_path.exists() {
            return;
        }

        let entries = match load_doc_file(&doc_path) {
            Ok(entries) => entries,
            Err(err) => {
                let message = match &err {
                    Error::Io { source, .. } => source.to_string(),
                    other => other.to_string(),
                };
                let warning = LoadWarning::DocSidecarUnreadable {
                    path: doc_path,
                    message,
                };
                log::warn!("{warning}");
                self.warnings.push(warning);
                return;
            }
        };

        for entry in entries {
            let alias = self
                .aliases
                .get(&entry.name)
                .and_then(|key| self.parts.get_mut(*key))
                .and_then(|part| part.alias_mut(&entry.name));
            match alias {
                Some(alias) => {
                    alias.description = entry.description;
                    alias.keywords = entry.keywords;
                    alias.doc_file = entry.doc_file;
                }
                None => {
                    let warning = LoadWarning::DocSidecarMismatch {
                        alias: entry.name,
                        source_name: doc_path.display().to_string(),
                    };
                    log::warn!("{warning}");
                    self.warnings.push(warning);
                }
            }
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VALUE;
    use std::fs;

    const LIB: &str = "EESchema-LIBRARY Version 2.4
#encoding utf-8
DEF LM358 U 0 20 Y Y 2 L N
F0 \"U\" 0 200 50 H V L CNN
F1 \"LM358\" 0 -200 50 H V L CNN
ALIAS LM2904 MC1458
ENDDEF
DEF R R 0 0 N Y 1 F N
F0 \"R\" 80 0 50 V V C CNN
F1 \"R\" 0 0 50 V V C CNN
ENDDEF
#
#End Library
";

    fn load(dir: &Path, lib: &str) -> LibraryCache {
        let path = dir.join("test.lib");
        fs::write(&path, lib).unwrap();
        LibraryCache::load(path, LibraryCacheOptions::default(), Epoch::new()).unwrap()
    }

    #[test]
    fn test_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = load(dir.path(), LIB);
        assert_eq!(cache.part_count(), 2);
        let names: Vec<_> = cache.alias_names().collect();
        assert_eq!(names, ["LM2904", "LM358", "MC1458", "R"]);
        let (part, alias) = cache.lookup("MC1458").unwrap();
        assert_eq!(part.name, "LM358");
        assert_eq!(alias.name, "MC1458");
        let parts: Vec<_> = cache.parts().map(|p| p.name.as_str()).collect();
        assert_eq!(parts, ["LM358", "R"]);
    }

    #[test]
    fn test_delete_root_alias_promotes_next() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = load(dir.path(), LIB);
        let epoch = cache.epoch().get();

        cache.delete_alias("LM358").unwrap();
        assert!(cache.is_modified());
        assert!(cache.epoch().get() > epoch);
        assert!(cache.part("LM358").is_none());
        let part = cache.part("MC1458").unwrap();
        assert_eq!(part.name, "LM2904");
        assert_eq!(part.fields[VALUE].text, "LM2904");
        assert_eq!(cache.part_count(), 2);
    }

    #[test]
    fn test_delete_last_alias_removes_part() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = load(dir.path(), LIB);
        cache.delete_alias("R").unwrap();
        assert_eq!(cache.part_count(), 1);
        assert!(cache.delete_alias("R").is_none());

        let part = cache.delete_symbol("LM2904").unwrap();
        assert_eq!(part.aliases.len(), 3);
        assert_eq!(cache.part_count(), 0);
        assert_eq!(cache.alias_names().count(), 0);
    }

    #[test]
    fn test_add_symbol_replaces_shadowed_aliases() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = load(dir.path(), LIB);

        let mut part = LibPart::new("MC1458");
        part.prefix = "IC".to_string();
        cache.add_symbol(part);

        assert_eq!(cache.part("MC1458").unwrap().prefix, "IC");
        assert_eq!(cache.part("LM358").unwrap().aliases.len(), 2);
        assert_eq!(cache.part_count(), 3);
    }

    #[test]
    fn test_save_writes_library_and_doc() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = load(dir.path(), LIB);

        // Unmodified caches are not written.
        cache.save().unwrap();
        assert!(!cache.doc_path().exists());

        let mut part = LibPart::new("C");
        part.prefix = "C".to_string();
        part.aliases[0].description = "Capacitor".to_string();
        cache.add_symbol(part);
        cache.save().unwrap();
        assert!(!cache.is_modified());
        assert!(!cache.is_file_changed());

        let doc = fs::read_to_string(cache.doc_path()).unwrap();
        assert!(doc.contains("$CMP C\nD Capacitor\n$ENDCMP\n"));

        let reloaded = LibraryCache::load(
            cache.path(),
            LibraryCacheOptions::default(),
            Epoch::new(),
        )
        .unwrap();
        assert_eq!(reloaded.part_count(), 3);
        assert_eq!(reloaded.lookup("C").unwrap().1.description, "Capacitor");
    }

    #[test]
    fn test_orphan_doc_entry_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("test.dcm"),
            "EESchema-DOCLIB  Version 2.0\n$CMP R\nD Resistor\n$ENDCMP\n$CMP GONE\nD x\n$ENDCMP\n",
        )
        .unwrap();
        let cache = load(dir.path(), LIB);
        assert_eq!(cache.lookup("R").unwrap().1.description, "Resistor");
        assert!(matches!(
            cache.warnings(),
            [LoadWarning::DocSidecarMismatch { alias, .. }] if alias == "GONE"
        ));
    }

    #[test]
    fn test_unreadable_doc_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("test.dcm"), "garbage\n").unwrap();
        let cache = load(dir.path(), LIB);
        assert_eq!(cache.part_count(), 2);
        assert!(matches!(
            cache.warnings(),
            [LoadWarning::DocSidecarUnreadable { .. }]
        ));
    }

    #[test]
    fn test_file_changed_and_ensure_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = load(dir.path(), LIB);
        assert!(!cache.is_file_changed());
        assert!(!cache.ensure_fresh().unwrap());

        let trimmed = LIB.replace("DEF R R 0 0 N Y 1 F N\nF0 \"R\" 80 0 50 V V C CNN\nF1 \"R\" 0 0 50 V V C CNN\nENDDEF\n", "");
        fs::write(cache.path(), trimmed).unwrap();
        let file = fs::File::options().write(true).open(cache.path()).unwrap();
        file.set_modified(SystemTime::now() + std::time::Duration::from_secs(60))
            .unwrap();

        assert!(cache.is_file_changed());
        assert!(cache.ensure_fresh().unwrap());
        assert_eq!(cache.part_count(), 1);
        assert!(!cache.is_file_changed());
    }

    #[cfg(unix)]
    #[test]
    fn test_save_writes_through_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real.lib");
        fs::write(&real, LIB).unwrap();
        let link = dir.path().join("link.lib");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let options = LibraryCacheOptions {
            load_doc: false,
            save_doc: false,
        };
        let mut cache = LibraryCache::load(&link, options, Epoch::new()).unwrap();
        cache.delete_symbol("R").unwrap();
        cache.save().unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert!(!fs::read_to_string(&real).unwrap().contains("DEF R "));
    }
}
