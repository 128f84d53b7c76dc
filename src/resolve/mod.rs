//! Reference parsing and collection resolution

pub mod collection;
pub mod identifier;

pub use collection::{resolve_collection, LibraryLayout, Playable, ResolvedCollection};
pub use identifier::{parse_reference, parse_references, ContentKind, TypedId};
