use std::collections::BTreeMap;

use lopdf::{Document, Object, ObjectId};
use thiserror::Error;

use crate::highlight::HighlightAnnotation;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to load PDF: {0}")]
    Load(lopdf::Error),
    #[error("page {0} not found in document")]
    PageNotFound(u32),
    #[error("malformed page {page}: {source}")]
    MalformedPage { page: u32, source: lopdf::Error },
    #[error("failed to write PDF: {0}")]
    Save(std::io::Error),
}

/// Where a page keeps its annotation array.
enum AnnotsSlot {
    Indirect(ObjectId),
    Inline,
    Missing,
}

/// A loaded PDF whose pages can receive highlight annotations.
pub struct AnnotatedDocument {
    doc: Document,
    pages: BTreeMap<u32, ObjectId>,
}

impl AnnotatedDocument {
    pub fn load(bytes: &[u8]) -> Result<Self, DocumentError> {
        let doc = Document::load_mem(bytes).map_err(DocumentError::Load)?;
        let pages = doc.get_pages();
        Ok(Self { doc, pages })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn contains_page(&self, page: u32) -> bool {
        self.pages.contains_key(&page)
    }

    fn page_id(&self, page: u32) -> Result<ObjectId, DocumentError> {
        self.pages.get(&page).copied().ok_or(DocumentError::PageNotFound(page))
    }

    /// Append `annotation` to the page's `/Annots`, keeping existing entries.
    ///
    /// `/Annots` may be a direct array or a reference to one; when it is
    /// absent a new single-element array is created. The document is left
    /// untouched if the existing `/Annots` cannot be resolved.
    pub fn attach(
        &mut self,
        page: u32,
        annotation: &HighlightAnnotation,
    ) -> Result<ObjectId, DocumentError> {
        let page_id = self.page_id(page)?;
        let malformed = |source| DocumentError::MalformedPage { page, source };

        let slot = match self.doc.get_dictionary(page_id).map_err(malformed)?.get(b"Annots") {
            Ok(Object::Reference(array_id)) => {
                self.doc
                    .get_object(*array_id)
                    .and_then(Object::as_array)
                    .map_err(malformed)?;
                AnnotsSlot::Indirect(*array_id)
            }
            Ok(Object::Array(_)) => AnnotsSlot::Inline,
            _ => AnnotsSlot::Missing,
        };

        let annot_id = self.doc.add_object(Object::Dictionary(annotation.to_dictionary()));
        let entry = Object::Reference(annot_id);

        match slot {
            AnnotsSlot::Indirect(array_id) => {
                self.doc
                    .get_object_mut(array_id)
                    .and_then(Object::as_array_mut)
                    .map_err(malformed)?
                    .push(entry);
            }
            AnnotsSlot::Inline => {
                self.page_dict_mut(page_id)
                    .map_err(malformed)?
                    .get_mut(b"Annots")
                    .and_then(Object::as_array_mut)
                    .map_err(malformed)?
                    .push(entry);
            }
            AnnotsSlot::Missing => {
                self.page_dict_mut(page_id)
                    .map_err(malformed)?
                    .set("Annots", Object::Array(vec![entry]));
            }
        }
        Ok(annot_id)
    }

    fn page_dict_mut(&mut self, page_id: ObjectId) -> lopdf::Result<&mut lopdf::Dictionary> {
        self.doc.get_object_mut(page_id).and_then(Object::as_dict_mut)
    }

    /// Number of entries in the page's `/Annots` array.
    pub fn annotation_count(&self, page: u32) -> Result<usize, DocumentError> {
        let page_id = self.page_id(page)?;
        let malformed = |source| DocumentError::MalformedPage { page, source };
        let page_dict = self.doc.get_dictionary(page_id).map_err(malformed)?;
        let Ok(annots) = page_dict.get(b"Annots") else {
            return Ok(0);
        };
        let annots = match annots {
            Object::Reference(id) => self.doc.get_object(*id).map_err(malformed)?,
            other => other,
        };
        Ok(annots.as_array().map(Vec::len).unwrap_or(0))
    }

    pub fn into_bytes(mut self) -> Result<Vec<u8>, DocumentError> {
        let mut buffer = Vec::new();
        self.doc.save_to(&mut buffer).map_err(DocumentError::Save)?;
        Ok(buffer)
    }
}
