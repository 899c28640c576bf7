//! Document-wide registries filled while parsing and finalized by the build.

mod controls;
mod dictionary;
mod external;
mod fonts;
mod gnames;
mod index;
mod maps;
mod nls;
mod strings;
mod synonym;

use std::io::Write;

use crate::error::Result;

pub use controls::{Button, ControlGroup, Controls, NO_GROUP};
pub use dictionary::{FtsEncoding, GlobalDictionary, MAX_WORDS, WordKey};
pub use external::ExternalFiles;
pub use fonts::{FONT_ENTRY_LEN, FontEntry, FontTable, MAX_FONTS};
pub use gnames::GlobalNames;
pub use index::{IndexCommand, IndexEntry, IndexTable, SecondaryEntry};
pub use maps::{NameMap, ResourceMap};
pub use nls::Nls;
pub use strings::StringTable;
pub use synonym::{Synonym, SynonymTable};

/// A self-contained output section.
///
/// The writer asks for [`size`](Section::size) first: a section with no
/// entries is not written at all.
pub trait Section {
    /// Number of entries.
    fn size(&self) -> usize;

    /// Serialized length in bytes.
    fn length(&self) -> usize;

    fn write_to(&self, out: &mut dyn Write) -> Result<()>;
}
