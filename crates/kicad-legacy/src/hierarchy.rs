//! Loading a root schematic together with every sheet it references.
//!
//! Each distinct file is parsed once. Sheets that name the same file share one
//! [`ScreenRef`], so an edit made through one sheet is seen through all of them.
//! Only a failure in the root file aborts the load; broken sub-sheets are
//! reported as [`LoadWarning::SubSheet`] and left empty.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::emit::{save_schematic, SchematicWriterOptions};
use crate::error::{Error, LoadWarning, Result};
use crate::model::{SchItem, Screen, ScreenLink, ScreenRef};
use crate::parser::load_schematic_file;

/// A fully loaded sheet hierarchy
#[derive(Debug)]
pub struct Schematic {
    root: ScreenRef,
    /// Every loaded screen keyed by absolute file path
    registry: BTreeMap<PathBuf, ScreenRef>,
    /// Sheets whose file failed to load. Their screens are empty placeholders.
    failed: HashSet<PathBuf>,
    warnings: Vec<LoadWarning>,
}

impl Schematic {
    /// Load `path` and, recursively, every sheet file it references.
    pub fn load(path: &Path) -> Result<Self> {
        let path = absolute_path(path);
        let mut loader = HierarchyLoader::default();

        let root = Screen::new(&path).into_ref();
        loader.registry.insert(path.clone(), root.clone());
        loader.enter(&path);
        *root.borrow_mut() = load_schematic_file(&path)?;
        loader.load_sheets(&root);
        loader.leave(&path);

        Ok(Self {
            root,
            registry: loader.registry,
            failed: loader.failed,
            warnings: loader.warnings,
        })
    }

    pub fn root(&self) -> &ScreenRef {
        &self.root
    }

    /// The screen loaded from `path`, if it is part of this hierarchy.
    pub fn screen(&self, path: &Path) -> Option<&ScreenRef> {
        self.registry.get(&absolute_path(path))
    }

    /// Every distinct screen, each once, ordered by path.
    pub fn screens(&self) -> impl Iterator<Item = (&Path, &ScreenRef)> {
        self.registry.iter().map(|(path, screen)| (path.as_path(), screen))
    }

    /// Problems with sub-sheets that did not stop the load
    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    /// All warnings as one message, one per line.
    pub fn warning_text(&self) -> String {
        self.warnings
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether the file at `path` was referenced but could not be loaded.
    pub fn is_failed(&self, path: &Path) -> bool {
        self.failed.contains(&absolute_path(path))
    }

    /// Write every screen back to the file it was loaded from. Sheets that
    /// failed to load are left untouched on disk.
    pub fn save_all(&self, options: &SchematicWriterOptions) -> Result<()> {
        for (path, screen) in &self.registry {
            if self.failed.contains(path) {
                log::warn!("not saving {}, it failed to load", path.display());
                continue;
            }
            save_schematic(&screen.borrow(), path, options)?;
            screen.borrow_mut().modified = false;
        }
        Ok(())
    }
}

#[derive(Default)]
struct HierarchyLoader {
    /// Directory of each sheet being loaded, innermost last
    path_stack: Vec<PathBuf>,
    /// Files currently being loaded, for cycle detection
    active: HashSet<PathBuf>,
    registry: BTreeMap<PathBuf, ScreenRef>,
    failed: HashSet<PathBuf>,
    warnings: Vec<LoadWarning>,
}

impl HierarchyLoader {
    fn enter(&mut self, path: &Path) {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        self.path_stack.push(dir);
        self.active.insert(path.to_path_buf());
    }

    fn leave(&mut self, path: &Path) {
        self.path_stack.pop();
        self.active.remove(path);
    }

    fn resolve(&self, file_name: &str) -> PathBuf {
        let file_name = Path::new(file_name);
        match self.path_stack.last() {
            Some(dir) if file_name.is_relative() => absolute_path(&dir.join(file_name)),
            _ => absolute_path(file_name),
        }
    }

    /// Attach a screen to every sheet of `parent` that does not have one yet.
    fn load_sheets(&mut self, parent: &ScreenRef) {
        let pending: Vec<(usize, String)> = parent
            .borrow()
            .items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| match item {
                SchItem::Sheet(sheet) if sheet.link.screen.is_none() => {
                    Some((i, sheet.file_name.clone()))
                }
                _ => None,
            })
            .collect();

        for (index, file_name) in pending {
            let path = self.resolve(&file_name);
            let screen = self.load_sheet(&path);
            if let SchItem::Sheet(sheet) = &mut parent.borrow_mut().items[index] {
                sheet.link = ScreenLink {
                    screen,
                    parent: Some(Rc::downgrade(parent)),
                };
            }
        }
    }

    fn load_sheet(&mut self, path: &Path) -> Option<ScreenRef> {
        if self.active.contains(path) {
            self.warn(path, &Error::CyclicHierarchy {
                path: path.to_path_buf(),
            });
            return None;
        }
        if let Some(screen) = self.registry.get(path) {
            log::debug!("reusing already loaded sheet {}", path.display());
            return Some(screen.clone());
        }

        log::debug!("loading sheet {}", path.display());
        let screen = Screen::new(path).into_ref();
        self.registry.insert(path.to_path_buf(), screen.clone());

        match load_schematic_file(path) {
            Ok(parsed) => {
                *screen.borrow_mut() = parsed;
                self.enter(path);
                self.load_sheets(&screen);
                self.leave(path);
            }
            Err(err) => {
                self.failed.insert(path.to_path_buf());
                self.warn(path, &err);
            }
        }
        Some(screen)
    }

    fn warn(&mut self, path: &Path, err: &Error) {
        let warning = LoadWarning::SubSheet {
            path: path.to_path_buf(),
            message: err.to_string(),
        };
        log::warn!("{warning}");
        self.warnings.push(warning);
    }
}

/// Absolute form of `path` used as the registry key. Symlinks are resolved
/// when the file exists.
fn absolute_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
