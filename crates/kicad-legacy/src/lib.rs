//! Reader and writer for the legacy EESchema file formats
//!
//! Covers `.sch` schematics (including hierarchical sheets), `.lib` symbol
//! libraries and their `.dcm` documentation files. Loaded documents round-trip:
//! writing a loaded document and loading the result gives an equal model.

pub mod cache;
pub mod emit;
pub mod error;
pub mod hierarchy;
pub mod model;
pub mod parser;
pub mod reader;
pub mod token;

pub use cache::{Epoch, LibraryCache, LibraryCacheOptions, PartKey};
pub use emit::{format_library, format_schematic, save_schematic, SchematicWriterOptions};
pub use error::{Error, LoadWarning, Location, Result};
pub use hierarchy::Schematic;
pub use parser::{
    load_library_file, load_schematic_file, parse_library, parse_schematic, LibVersion,
    LibraryFile,
};

/// Schematic format version written by this crate
pub const SCHEMATIC_VERSION: i32 = 4;
