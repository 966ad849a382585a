use crate::types::{BoundingBox, PageLayout};

/// Tolerance used by [`is_within_bounds`] when none is given.
pub const DEFAULT_MARGIN: f32 = 10.0;

/// Bounding boxes of logical line `target` on the page.
///
/// Lines are counted across all containers in layout order, starting
/// at 1. Returns an empty vec when the page has no such line.
pub fn locate(layout: &PageLayout, target: usize) -> Vec<BoundingBox> {
    layout
        .numbered_lines()
        .find(|(index, _)| *index == target)
        .map(|(_, line)| vec![line.bbox])
        .unwrap_or_default()
}

pub fn line_count(layout: &PageLayout) -> usize {
    layout.containers.iter().map(|c| c.lines.len()).sum()
}

/// Whether `bbox` lies inside `container`, allowing `margin` units of overhang on each side.
pub fn is_within_bounds(bbox: &BoundingBox, container: &BoundingBox, margin: f32) -> bool {
    container.x0 <= bbox.x0 + margin
        && container.y0 <= bbox.y0 + margin
        && container.x1 >= bbox.x1 - margin
        && container.y1 >= bbox.y1 - margin
}
