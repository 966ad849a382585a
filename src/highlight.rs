use lopdf::{Dictionary, Object};
use thiserror::Error;

use crate::types::{BoundingBox, Rgb};

/// Annotation flag bit 3: print the annotation with the page.
pub const PRINT_FLAG: u32 = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HighlightError {
    #[error("invalid input: a highlight needs at least one bounding box")]
    InvalidInput,
}

/// A `/Highlight` annotation covering one or more text boxes.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightAnnotation {
    pub rect: BoundingBox,
    pub quad_points: Vec<f32>,
    pub color: Rgb,
    pub flags: u32,
}

/// Merge `boxes` into a single highlight.
///
/// The rectangle is the union of all boxes. Each box contributes one
/// quadrilateral in viewer order: top-left, top-right, bottom-left,
/// bottom-right.
pub fn build(boxes: &[BoundingBox], color: Rgb) -> Result<HighlightAnnotation, HighlightError> {
    let rect = boxes
        .iter()
        .copied()
        .reduce(|acc, b| acc.union(&b))
        .ok_or(HighlightError::InvalidInput)?;

    let quad_points = boxes
        .iter()
        .flat_map(|b| [b.x0, b.y1, b.x1, b.y1, b.x0, b.y0, b.x1, b.y0])
        .collect();

    Ok(HighlightAnnotation { rect, quad_points, color, flags: PRINT_FLAG })
}

fn reals(values: impl IntoIterator<Item = f32>) -> Object {
    Object::Array(values.into_iter().map(Object::Real).collect())
}

impl HighlightAnnotation {
    pub fn to_dictionary(&self) -> Dictionary {
        let r = &self.rect;
        let mut annot = Dictionary::new();
        annot.set("Type", Object::Name(b"Annot".to_vec()));
        annot.set("Subtype", Object::Name(b"Highlight".to_vec()));
        annot.set("F", Object::Integer(i64::from(self.flags)));
        annot.set("C", reals(self.color.components()));
        annot.set("Rect", reals([r.x0, r.y0, r.x1, r.y1]));
        annot.set("QuadPoints", reals(self.quad_points.iter().copied()));
        annot
    }
}
