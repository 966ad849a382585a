use std::sync::{Mutex, PoisonError};

use pdfium_render::prelude::*;
use thiserror::Error;

use crate::layout;
use crate::types::{PageChars, PageLayout, PdfChar};

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("failed to bind pdfium: {0}")]
    Bind(String),
    #[error("failed to load PDF for layout analysis: {0}")]
    Load(String),
    #[error("page {page} is out of range (document has {count} pages)")]
    PageOutOfRange { page: u32, count: usize },
    #[error("failed to load text for page {page}: {message}")]
    Text { page: u32, message: String },
}

/// Produces the text layout of one page of a PDF.
pub trait LayoutSource: Send + Sync {
    /// `page` is 1-based.
    fn page_layout(&self, pdf: &[u8], page: u32) -> Result<PageLayout, LayoutError>;
}

/// Layout analysis backed by the pdfium shared library.
///
/// The library is bound for the duration of each call. Calls are
/// serialised because pdfium initialisation is process-global.
pub struct PdfiumLayouts {
    library_path: Option<String>,
    guard: Mutex<()>,
}

impl PdfiumLayouts {
    pub fn new(library_path: Option<String>) -> Self {
        Self { library_path, guard: Mutex::new(()) }
    }

    fn bind(&self) -> Result<Pdfium, LayoutError> {
        let bindings = match &self.library_path {
            Some(path) => Pdfium::bind_to_library(path)
                .map_err(|e| LayoutError::Bind(format!("{path}: {e}")))?,
            None => Pdfium::bind_to_system_library().map_err(|e| {
                LayoutError::Bind(format!(
                    "{e}. Install pdfium-binaries or set PDFIUM_LIB_PATH"
                ))
            })?,
        };
        Ok(Pdfium::new(bindings))
    }
}

impl LayoutSource for PdfiumLayouts {
    fn page_layout(&self, pdf: &[u8], page: u32) -> Result<PageLayout, LayoutError> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| LayoutError::Load(e.to_string()))?;

        let pages = document.pages();
        let count = pages.iter().count();
        let pdf_page = page
            .checked_sub(1)
            .and_then(|idx| pages.iter().nth(idx as usize))
            .ok_or(LayoutError::PageOutOfRange { page, count })?;

        let chars = extract_page_chars(page, &pdf_page)?;
        tracing::debug!(page, chars = chars.chars.len(), "extracted page characters");
        Ok(layout::group_page(&chars))
    }
}

fn extract_page_chars(page_num: u32, page: &PdfPage) -> Result<PageChars, LayoutError> {
    let text_page = page.text().map_err(|e| LayoutError::Text {
        page: page_num,
        message: e.to_string(),
    })?;

    let chars: Vec<PdfChar> = text_page
        .chars()
        .iter()
        .filter_map(|ch| convert_text_char(&ch))
        .collect();

    Ok(PageChars {
        page_num: page_num as usize,
        width: page.width().value,
        chars,
    })
}

fn convert_text_char(ch: &PdfPageTextChar) -> Option<PdfChar> {
    let unicode = ch.unicode_char()?;
    if unicode.is_control() && unicode != ' ' {
        return None;
    }

    // Zero-size glyphs are hidden text or watermarks.
    let font_size = ch.scaled_font_size().value;
    if font_size < 0.5 {
        return None;
    }

    let rect = ch.loose_bounds().or_else(|_| ch.tight_bounds()).ok()?;
    let (left, right) = (rect.left().value, rect.right().value);
    let (bottom, top) = (rect.bottom().value, rect.top().value);

    Some(PdfChar {
        ch: unicode,
        x: left.min(right),
        y: bottom.min(top),
        width: (right - left).abs(),
        height: (top - bottom).abs(),
        font_size,
    })
}
