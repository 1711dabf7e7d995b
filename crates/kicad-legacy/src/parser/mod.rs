//! Loaders for the legacy schematic, library and documentation formats

mod doc;
mod library;
mod schematic;

pub use doc::{load_doc, load_doc_file, parse_doc, DocEntry, DOC_HEADER};
pub use library::{
    load_library_file, parse_library, LibVersion, LibraryFile, LibraryLoader, LIBRARY_HEADER,
};
pub use schematic::{load_schematic_file, parse_schematic, SchematicLoader, SCHEMATIC_HEADER};
pub(crate) use schematic::NO_NAME_REFERENCE;
