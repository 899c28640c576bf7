//! Whole-document transforms run between parse and write.

use super::Document;
use crate::bitmap::{Bitmap, BitmapStore};
use crate::error::{Error, Result};
use crate::page::LinearizeContext;
use crate::util::resolve_in_path;

/// Most pages a TOC count field can hold.
pub(crate) const MAX_PAGES: usize = u16::MAX as usize;

impl Document {
    pub(super) fn run_build(&mut self) -> Result<()> {
        if self.pages.len() > MAX_PAGES {
            return Err(Error::TooManyPages(self.pages.len()));
        }

        for page in &mut self.pages {
            page.build_toc(self.max_level, &self.controls)?;
        }
        let visible = self.pages.iter().filter(|p| p.is_visible()).count();
        if visible == 0 {
            return Err(Error::NoVisiblePages);
        }
        tracing::debug!("{} of {} pages visible", visible, self.pages.len());

        self.dictionary.convert()?;
        self.external.convert();

        // dropped (and its file removed) if anything below fails
        let bitmaps = self.stage_bitmaps()?;

        {
            let mut ctx = LinearizeContext {
                dictionary: &mut self.dictionary,
                resources: &self.resources,
                names: &self.names,
                external: &self.external,
                bitmaps: bitmaps.as_ref(),
                index: &mut self.index,
                synonyms: &self.synonyms,
                note_label: &self.note_label,
            };
            for page in &mut self.pages {
                page.linearize(&mut ctx)?;
            }
        }

        self.index.sort();

        let positions = self.index.positions_by_page(self.pages.len());
        for (page, positions) in self.pages.iter_mut().zip(positions) {
            page.build_index(positions);
            page.build_local_dictionary();
        }

        for cell in &mut self.cells {
            cell.build(&mut self.dictionary)?;
        }

        if self.options.searchable {
            self.fts_wide = self.dictionary.build_fts(self.pages.len());
        }

        self.bitmaps = bitmaps;
        Ok(())
    }

    /// Find, convert and stage every `:artwork` image.
    fn stage_bitmaps(&self) -> Result<Option<BitmapStore>> {
        if self.bitmap_names.is_empty() {
            return Ok(None);
        }
        let mut store = BitmapStore::new()?;
        for name in &self.bitmap_names {
            let (bitmap, path) = resolve_in_path(&self.options.image_path, name, Bitmap::open)?;
            let offset = store.stage(name, &bitmap)?;
            tracing::debug!(
                "staged {} ({}x{}, {} bpp) at {}",
                path.display(),
                bitmap.width,
                bitmap.height,
                bitmap.bits_per_pixel,
                offset
            );
        }
        Ok(Some(store))
    }
}
